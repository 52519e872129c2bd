// src/store/users.rs
// User account persistence.

use sqlx::Row;

use super::models::{now_ts, PublicUser, User};
use super::{with_busy_retry, Store};
use crate::error::{AppError, AppResult};

impl Store {
    pub async fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> AppResult<User> {
        let created_at = now_ts();
        with_busy_retry(|| {
            sqlx::query(
                r#"
                INSERT INTO users (id, username, email, password_hash, is_admin, must_change_password, created_at)
                VALUES (?, ?, NULL, ?, ?, 0, ?)
                "#,
            )
            .bind(id)
            .bind(username)
            .bind(password_hash)
            .bind(is_admin)
            .bind(created_at)
            .execute(&self.pool)
        })
        .await?;

        self.get_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::StoreFatal("user vanished after insert".into()))
    }

    pub async fn get_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx(e, true))
    }

    pub async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx(e, true))
    }

    pub async fn username_taken(&self, username: &str) -> AppResult<bool> {
        Ok(self.get_user_by_username(username).await?.is_some())
    }

    pub async fn record_login(&self, user_id: &str) -> AppResult<()> {
        with_busy_retry(|| {
            sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
                .bind(now_ts())
                .bind(user_id)
                .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    pub async fn set_password_hash(
        &self,
        user_id: &str,
        password_hash: &str,
        must_change_password: bool,
    ) -> AppResult<()> {
        let rows = with_busy_retry(|| {
            sqlx::query(
                "UPDATE users SET password_hash = ?, must_change_password = ? WHERE id = ?",
            )
            .bind(password_hash)
            .bind(must_change_password)
            .bind(user_id)
            .execute(&self.pool)
        })
        .await?;
        if rows.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    pub async fn set_preferences(&self, user_id: &str, preferences_json: &str) -> AppResult<()> {
        let rows = with_busy_retry(|| {
            sqlx::query("UPDATE users SET preferences = ? WHERE id = ?")
                .bind(preferences_json)
                .bind(user_id)
                .execute(&self.pool)
        })
        .await?;
        if rows.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    pub async fn list_users(&self) -> AppResult<Vec<PublicUser>> {
        let rows = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx(e, true))?;
        Ok(rows.into_iter().map(PublicUser::from).collect())
    }

    pub async fn user_count(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS c FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx(e, true))?;
        Ok(row.get::<i64, _>("c"))
    }

    /// Deletes `target_id`, but only when `requested_by` is an admin — a
    /// user is never permitted to delete their own account through this
    /// path. `Forbidden` if the requester isn't an admin, `NotFound` if
    /// `target_id` doesn't exist.
    pub async fn delete_user(&self, requested_by: &str, target_id: &str) -> AppResult<()> {
        let requester = self
            .get_user_by_id(requested_by)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {requested_by}")))?;
        if !requester.is_admin {
            return Err(AppError::Forbidden);
        }
        if requested_by == target_id {
            return Err(AppError::InvalidInput("a user cannot delete their own account".into()));
        }

        let rows = with_busy_retry(|| {
            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(target_id)
                .execute(&self.pool)
        })
        .await?;
        if rows.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {target_id}")));
        }
        Ok(())
    }
}
