use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("feed not found: {0}")]
    FeedNotFound(String),

    #[error("not following feed: {0}")]
    FollowNotFound(String),

    #[error("user already exists: {0}")]
    DuplicateUser(String),

    #[error("feed already exists: {0}")]
    DuplicateFeed(String),

    #[error("already following feed: {0}")]
    DuplicateFollow(String),

    /// A post with this URL is already stored. Expected during scraping.
    #[error("post already exists: {0}")]
    DuplicatePost(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify an INSERT failure.
    ///
    /// Only a unique violation on `constraint` (a `table.column` pair as SQLite
    /// reports it) is mapped through `on_duplicate`; every other failure stays
    /// a generic database error.
    pub(crate) fn from_insert(
        err: sqlx::Error,
        constraint: &str,
        on_duplicate: impl FnOnce() -> Self,
    ) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() && db_err.message().contains(constraint) {
                return on_duplicate();
            }
        }
        DatabaseError::Other(err)
    }

    /// True for the duplicate-post outcome the scraper swallows.
    pub fn is_duplicate_post(&self) -> bool {
        matches!(self, DatabaseError::DuplicatePost(_))
    }
}

// ============================================================================
// Helper Types
// ============================================================================

/// Current wall-clock time as stored in the database (unix milliseconds).
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// A post about to be inserted by the scraper
#[derive(Debug, Clone)]
pub struct NewPost {
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserRow {
    pub(crate) fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedRow {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_fetched_at: Option<i64>,
}

impl FeedRow {
    pub(crate) fn into_feed(self) -> Feed {
        Feed {
            id: self.id,
            name: self.name,
            url: self.url,
            user_id: self.user_id,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
            last_fetched_at: self.last_fetched_at.map(from_millis),
        }
    }
}

/// Feed joined with the name of the user who added it
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedOwnerRow {
    #[sqlx(flatten)]
    pub feed: FeedRow,
    pub user_name: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FollowRow {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub user_name: String,
    pub feed_name: String,
    pub feed_url: String,
}

impl FollowRow {
    pub(crate) fn into_followed(self) -> FollowedFeed {
        FollowedFeed {
            id: self.id,
            user_id: self.user_id,
            feed_id: self.feed_id,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
            user_name: self.user_name,
            feed_name: self.feed_name,
            feed_url: self.feed_url,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PostRow {
    pub(crate) fn into_post(self) -> Post {
        Post {
            id: self.id,
            feed_id: self.feed_id,
            title: self.title,
            url: self.url,
            description: self.description,
            published_at: self.published_at.map(from_millis),
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostFeedRow {
    #[sqlx(flatten)]
    pub post: PostRow,
    pub feed_name: String,
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Feed data from database
///
/// `last_fetched_at` is `None` until the scraper first picks the feed up, and
/// is advanced on every attempt whether or not the fetch succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    pub feed: Feed,
    pub user_name: String,
}

/// A follow relationship with the names needed to print it
#[derive(Debug, Clone)]
pub struct FollowedFeed {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: String,
    pub feed_name: String,
    pub feed_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PostWithFeed {
    pub post: Post,
    pub feed_name: String,
}
