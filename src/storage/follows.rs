use super::schema::Database;
use super::types::{now_millis, DatabaseError, FollowRow, FollowedFeed};

impl Database {
    // ========================================================================
    // Feed Follow Operations
    // ========================================================================

    /// Subscribe `user_id` to `feed_id`, returning the follow with the user
    /// and feed names filled in. A pair can only be followed once.
    pub async fn create_feed_follow(
        &self,
        user_id: i64,
        feed_id: i64,
    ) -> Result<FollowedFeed, DatabaseError> {
        let now = now_millis();
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DatabaseError::from_insert(e, "feed_follows.user_id", || {
                DatabaseError::DuplicateFollow(format!("feed id {}", feed_id))
            })
        })?;

        let row = sqlx::query_as::<_, FollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, ff.created_at, ff.updated_at,
                   u.name AS user_name, f.name AS feed_name, f.url AS feed_url
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.id = ?
        "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_followed())
    }

    /// Feeds `user_id` follows, in the order they were followed
    pub async fn get_feed_follows_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<FollowedFeed>, DatabaseError> {
        let rows = sqlx::query_as::<_, FollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, ff.created_at, ff.updated_at,
                   u.name AS user_name, f.name AS feed_name, f.url AS feed_url
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = ?
            ORDER BY ff.created_at, ff.id
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FollowRow::into_followed).collect())
    }

    /// Remove the follow of (`user_id`, `feed_id`).
    ///
    /// Fails with [`DatabaseError::FollowNotFound`] when the user was not
    /// following the feed.
    pub async fn delete_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::FollowNotFound(format!("feed id {}", feed_id)));
        }
        Ok(())
    }
}
