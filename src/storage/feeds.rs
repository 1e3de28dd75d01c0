use super::schema::Database;
use super::types::{now_millis, DatabaseError, Feed, FeedOwnerRow, FeedRow, FeedWithOwner};

const FEED_COLUMNS: &str = "id, name, url, user_id, created_at, updated_at, last_fetched_at";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Add a feed owned by `user_id`. Feed URLs are globally unique.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: i64,
    ) -> Result<Feed, DatabaseError> {
        let now = now_millis();
        let row = sqlx::query_as::<_, FeedRow>(&format!(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {FEED_COLUMNS}
        "#
        ))
        .bind(name)
        .bind(url)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DatabaseError::from_insert(e, "feeds.url", || {
                DatabaseError::DuplicateFeed(url.to_string())
            })
        })?;

        Ok(row.into_feed())
    }

    /// All feeds with the name of the user who added each, oldest first
    pub async fn get_feeds(&self) -> Result<Vec<FeedWithOwner>, DatabaseError> {
        let rows = sqlx::query_as::<_, FeedOwnerRow>(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.created_at, f.updated_at,
                   f.last_fetched_at, u.name AS user_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at, f.id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FeedWithOwner {
                feed: row.feed.into_feed(),
                user_name: row.user_name,
            })
            .collect())
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Feed, DatabaseError> {
        let row = sqlx::query_as::<_, FeedRow>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FeedRow::into_feed)
            .ok_or_else(|| DatabaseError::FeedNotFound(url.to_string()))
    }

    /// The feed the scraper should visit next.
    ///
    /// Feeds that were never fetched come first, then the one fetched longest
    /// ago. Ties go to the feed that was added first. Returns `None` when no
    /// feeds exist.
    pub async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>, DatabaseError> {
        let row = sqlx::query_as::<_, FeedRow>(&format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, id ASC
            LIMIT 1
        "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FeedRow::into_feed))
    }

    /// Record a fetch attempt: `last_fetched_at` and `updated_at` become now.
    pub async fn mark_feed_fetched(&self, feed_id: i64) -> Result<Feed, DatabaseError> {
        let now = now_millis();
        let row = sqlx::query_as::<_, FeedRow>(&format!(
            r#"
            UPDATE feeds SET last_fetched_at = ?, updated_at = ?
            WHERE id = ?
            RETURNING {FEED_COLUMNS}
        "#
        ))
        .bind(now)
        .bind(now)
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FeedRow::into_feed)
            .ok_or_else(|| DatabaseError::FeedNotFound(format!("id {}", feed_id)))
    }
}
