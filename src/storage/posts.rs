use super::schema::Database;
use super::types::{now_millis, DatabaseError, NewPost, Post, PostFeedRow, PostRow, PostWithFeed};

/// Upper bound on a single `browse` page
const MAX_POSTS: i64 = 1000;

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Store a scraped post.
    ///
    /// Post URLs are globally unique; a second insert of the same URL (from
    /// any feed) fails with [`DatabaseError::DuplicatePost`] and leaves the
    /// stored post untouched.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post, DatabaseError> {
        let now = now_millis();
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, feed_id, title, url, description, published_at, created_at, updated_at
        "#,
        )
        .bind(post.feed_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at.map(|dt| dt.timestamp_millis()))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DatabaseError::from_insert(e, "posts.url", || {
                DatabaseError::DuplicatePost(post.url.clone())
            })
        })?;

        Ok(row.into_post())
    }

    /// Posts stored for one feed, in insertion order
    pub async fn get_posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY id
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PostRow::into_post).collect())
    }

    /// Newest posts across every feed `user_id` follows.
    ///
    /// Ordered by publish time, most recent first; posts without a publish
    /// time sort last. `limit` is capped at [`MAX_POSTS`].
    pub async fn get_posts_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<PostWithFeed>, DatabaseError> {
        let limit = limit.clamp(0, MAX_POSTS);
        tracing::debug!(user_id, limit, "get_posts_for_user");

        let rows = sqlx::query_as::<_, PostFeedRow>(
            r#"
            SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at,
                   p.created_at, p.updated_at, f.name AS feed_name
            FROM posts p
            JOIN feeds f ON f.id = p.feed_id
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC NULLS LAST, p.id DESC
            LIMIT ?
        "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PostWithFeed {
                post: row.post.into_post(),
                feed_name: row.feed_name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, DatabaseError, Feed, NewPost, User};
    use chrono::{TimeZone, Utc};

    async fn seed() -> (Database, User, Feed) {
        let db = Database::open(":memory:").await.unwrap();
        let user = db.create_user("alice").await.unwrap();
        let feed = db
            .create_feed("Blog", "https://example.com/rss", user.id)
            .await
            .unwrap();
        (db, user, feed)
    }

    fn new_post(feed_id: i64, url: &str, day: Option<u32>) -> NewPost {
        NewPost {
            feed_id,
            title: format!("Post {}", url),
            url: url.to_string(),
            description: Some("body".to_string()),
            published_at: day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_create_post_round_trip() {
        let (db, _, feed) = seed().await;
        let created = db
            .create_post(&new_post(feed.id, "https://example.com/1", Some(3)))
            .await
            .unwrap();

        let stored = db.get_posts_for_feed(feed.id).await.unwrap();
        assert_eq!(stored, vec![created.clone()]);
        assert_eq!(
            created.published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_duplicate_post_url_rejected_across_feeds() {
        let (db, user, feed) = seed().await;
        let other = db
            .create_feed("Other", "https://other.example.com/rss", user.id)
            .await
            .unwrap();

        db.create_post(&new_post(feed.id, "https://example.com/1", None))
            .await
            .unwrap();
        let err = db
            .create_post(&new_post(other.id, "https://example.com/1", None))
            .await
            .unwrap_err();

        assert!(err.is_duplicate_post());
        assert_eq!(db.get_posts_for_feed(feed.id).await.unwrap().len(), 1);
        assert!(db.get_posts_for_feed(other.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_for_missing_feed_is_not_a_duplicate() {
        let (db, _, _) = seed().await;
        let err = db
            .create_post(&new_post(9999, "https://example.com/1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Other(_)));
        assert!(!err.is_duplicate_post());
    }

    #[tokio::test]
    async fn test_posts_for_user_newest_first_with_limit() {
        let (db, user, feed) = seed().await;
        db.create_feed_follow(user.id, feed.id).await.unwrap();
        for (url, day) in [("a", 1), ("b", 5), ("c", 3)] {
            db.create_post(&new_post(feed.id, url, Some(day)))
                .await
                .unwrap();
        }

        let posts = db.get_posts_for_user(user.id, 2).await.unwrap();
        let urls: Vec<&str> = posts.iter().map(|p| p.post.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "c"]);
        assert!(posts.iter().all(|p| p.feed_name == "Blog"));
    }

    #[tokio::test]
    async fn test_posts_without_date_sort_last() {
        let (db, user, feed) = seed().await;
        db.create_feed_follow(user.id, feed.id).await.unwrap();
        db.create_post(&new_post(feed.id, "undated", None))
            .await
            .unwrap();
        db.create_post(&new_post(feed.id, "dated", Some(1)))
            .await
            .unwrap();

        let posts = db.get_posts_for_user(user.id, 10).await.unwrap();
        assert_eq!(posts[0].post.url, "dated");
        assert_eq!(posts[1].post.url, "undated");
    }

    #[tokio::test]
    async fn test_posts_only_from_followed_feeds() {
        let (db, user, feed) = seed().await;
        let other = db
            .create_feed("Other", "https://other.example.com/rss", user.id)
            .await
            .unwrap();
        db.create_feed_follow(user.id, feed.id).await.unwrap();

        db.create_post(&new_post(feed.id, "mine", Some(1)))
            .await
            .unwrap();
        db.create_post(&new_post(other.id, "not-followed", Some(2)))
            .await
            .unwrap();

        let posts = db.get_posts_for_user(user.id, 10).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].post.url, "mine");
    }
}
