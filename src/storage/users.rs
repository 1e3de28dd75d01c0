use super::schema::Database;
use super::types::{now_millis, DatabaseError, User, UserRow};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Register a new user. Names are unique.
    pub async fn create_user(&self, name: &str) -> Result<User, DatabaseError> {
        let now = now_millis();
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, created_at, updated_at)
            VALUES (?, ?, ?)
            RETURNING id, name, created_at, updated_at
        "#,
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DatabaseError::from_insert(e, "users.name", || {
                DatabaseError::DuplicateUser(name.to_string())
            })
        })?;

        Ok(row.into_user())
    }

    /// Look a user up by name
    pub async fn get_user(&self, name: &str) -> Result<User, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user)
            .ok_or_else(|| DatabaseError::UserNotFound(name.to_string()))
    }

    /// All users in registration order
    pub async fn get_users(&self) -> Result<Vec<User>, DatabaseError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    /// Delete every user. Feeds, follows and posts go with them via
    /// `ON DELETE CASCADE`. Returns the number of users removed.
    pub async fn reset(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, DatabaseError};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = test_db().await;
        let created = db.create_user("alice").await.unwrap();
        assert_eq!(created.name, "alice");

        let fetched = db.get_user("alice").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let db = test_db().await;
        db.create_user("alice").await.unwrap();

        let err = db.create_user("alice").await.unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateUser(ref n) if n == "alice"));
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let db = test_db().await;
        let err = db.get_user("bob").await.unwrap_err();
        assert!(matches!(err, DatabaseError::UserNotFound(_)));
        assert_eq!(err.to_string(), "user not found: bob");
    }

    #[tokio::test]
    async fn test_get_users_in_registration_order() {
        let db = test_db().await;
        for name in ["carol", "alice", "bob"] {
            db.create_user(name).await.unwrap();
        }

        let names: Vec<String> = db
            .get_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["carol", "alice", "bob"]);
    }

    #[tokio::test]
    async fn test_reset_cascades_to_feeds_follows_and_posts() {
        let db = test_db().await;
        let user = db.create_user("alice").await.unwrap();
        let feed = db
            .create_feed("Blog", "https://example.com/rss", user.id)
            .await
            .unwrap();
        db.create_feed_follow(user.id, feed.id).await.unwrap();
        db.create_post(&crate::storage::NewPost {
            feed_id: feed.id,
            title: "Hello".into(),
            url: "https://example.com/hello".into(),
            description: None,
            published_at: None,
        })
        .await
        .unwrap();

        assert_eq!(db.reset().await.unwrap(), 1);

        assert!(db.get_users().await.unwrap().is_empty());
        assert!(db.get_feeds().await.unwrap().is_empty());
        assert!(db.get_posts_for_feed(feed.id).await.unwrap().is_empty());
        assert!(db.get_next_feed_to_fetch().await.unwrap().is_none());
    }
}
