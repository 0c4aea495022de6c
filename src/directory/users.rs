/// User and interest storage
use crate::directory::events::parse_timestamp;
use crate::directory::models::{Interest, Role, User};
use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// User directory
#[derive(Clone)]
pub struct UserDirectory {
    db: SqlitePool,
}

impl UserDirectory {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Register a new user with the default role
    pub async fn create_user(
        &self,
        display_name: &str,
        email: &str,
    ) -> ServiceResult<User> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, email, role, is_active, created_at)
            VALUES (?, ?, ?, 'user', 1, ?)
            "#,
        )
        .bind(&id)
        .bind(display_name)
        .bind(email)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                ServiceError::Conflict(format!("Email {} already registered", email))
            }
            other => ServiceError::Database(other),
        })?;

        self.get_user(&id).await
    }

    /// Get user by id
    pub async fn get_user(&self, id: &str) -> ServiceResult<User> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let mut user = parse_user(row)?;
                user.interest_ids = self.interest_ids(id).await?;
                Ok(user)
            }
            None => Err(ServiceError::NotFound(format!("User {} not found", id))),
        }
    }

    /// Profile update keyed by id; returns false when the id is unknown
    pub async fn update_user(&self, user: &User) -> ServiceResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET display_name = ?,
                email = ?,
                bio = ?,
                avatar_url = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(&user.id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        self.replace_interests(&user.id, &user.interest_ids).await?;
        Ok(true)
    }

    /// Change a user's role; returns false when the id is unknown
    pub async fn set_role(&self, id: &str, role: Role) -> ServiceResult<bool> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set or clear a user's blocked state; returns false when unknown
    pub async fn set_blocked(
        &self,
        id: &str,
        blocked_until: Option<DateTime<Utc>>,
        active: bool,
    ) -> ServiceResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET is_active = ?, blocked_until = ? WHERE id = ?",
        )
        .bind(active)
        .bind(blocked_until.map(|dt| dt.to_rfc3339()))
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Create an interest if it does not exist yet
    pub async fn create_interest(&self, name: &str) -> ServiceResult<Interest> {
        let id = Uuid::new_v4().to_string();

        sqlx::query("INSERT OR IGNORE INTO interests (id, name) VALUES (?, ?)")
            .bind(&id)
            .bind(name)
            .execute(&self.db)
            .await?;

        let row = sqlx::query("SELECT id, name FROM interests WHERE name = ?")
            .bind(name)
            .fetch_one(&self.db)
            .await?;

        Ok(Interest {
            id: row.get("id"),
            name: row.get("name"),
        })
    }

    /// List all interests
    pub async fn list_interests(&self) -> ServiceResult<Vec<Interest>> {
        let rows = sqlx::query("SELECT id, name FROM interests ORDER BY name ASC")
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Interest {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    async fn replace_interests(&self, user_id: &str, interest_ids: &[String]) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM user_interest WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for interest_id in interest_ids {
            sqlx::query("INSERT INTO user_interest (user_id, interest_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(interest_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn interest_ids(&self, user_id: &str) -> ServiceResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT interest_id FROM user_interest WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

fn parse_user(row: sqlx::sqlite::SqliteRow) -> ServiceResult<User> {
    let role_str: String = row.get("role");
    let role = Role::from_str(&role_str)?;

    let created_at_str: String = row.get("created_at");
    let created_at = parse_timestamp(&created_at_str)?;

    let blocked_until = row
        .try_get::<String, _>("blocked_until")
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(User {
        id: row.get("id"),
        display_name: row.get("display_name"),
        email: row.get("email"),
        role,
        is_active: row.get("is_active"),
        blocked_until,
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        interest_ids: Vec::new(),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let directory = UserDirectory::new(crate::db::test_pool().await);

        let user = directory
            .create_user("Alice", "alice@example.com")
            .await
            .unwrap();

        assert_eq!(user.display_name, "Alice");
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);
        assert!(user.blocked_until.is_none());

        let fetched = directory.get_user(&user.id).await.unwrap();
        assert_eq!(fetched.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let directory = UserDirectory::new(crate::db::test_pool().await);

        directory
            .create_user("Alice", "alice@example.com")
            .await
            .unwrap();
        let err = directory
            .create_user("Imposter", "alice@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_set_role_and_blocked() {
        let directory = UserDirectory::new(crate::db::test_pool().await);
        let user = directory
            .create_user("Bob", "bob@example.com")
            .await
            .unwrap();

        assert!(directory.set_role(&user.id, Role::Moderator).await.unwrap());
        assert_eq!(
            directory.get_user(&user.id).await.unwrap().role,
            Role::Moderator
        );

        let until = Utc::now() + chrono::Duration::days(7);
        assert!(directory
            .set_blocked(&user.id, Some(until), false)
            .await
            .unwrap());
        let blocked = directory.get_user(&user.id).await.unwrap();
        assert!(!blocked.is_active);
        assert!(blocked.blocked_until.is_some());

        assert!(!directory.set_role("missing", Role::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_user_replaces_interests() {
        let directory = UserDirectory::new(crate::db::test_pool().await);
        let mut user = directory
            .create_user("Carol", "carol@example.com")
            .await
            .unwrap();

        let hiking = directory.create_interest("hiking").await.unwrap();
        let chess = directory.create_interest("chess").await.unwrap();

        user.interest_ids = vec![hiking.id.clone(), chess.id.clone()];
        user.bio = Some("Weekend hiker".to_string());
        assert!(directory.update_user(&user).await.unwrap());

        let fetched = directory.get_user(&user.id).await.unwrap();
        assert_eq!(fetched.interest_ids.len(), 2);
        assert_eq!(fetched.bio.as_deref(), Some("Weekend hiker"));

        user.interest_ids = vec![chess.id.clone()];
        directory.update_user(&user).await.unwrap();
        let fetched = directory.get_user(&user.id).await.unwrap();
        assert_eq!(fetched.interest_ids, vec![chess.id]);
    }
}
