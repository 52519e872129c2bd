// src/store/lockout.rs
// Durable failed-login tracking: a table instead of an in-memory
// rate-limiter map, so lockout state survives restarts and is consistent
// across multiple process instances sharing one store.

use super::models::now_ts;
use super::{with_busy_retry, Store};
use crate::error::AppResult;

impl Store {
    pub async fn record_failed_login(&self, username: &str) -> AppResult<()> {
        with_busy_retry(|| {
            sqlx::query("INSERT INTO failed_logins (username, attempted_at) VALUES (?, ?)")
                .bind(username)
                .bind(now_ts())
                .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    pub async fn clear_failed_logins(&self, username: &str) -> AppResult<()> {
        with_busy_retry(|| {
            sqlx::query("DELETE FROM failed_logins WHERE username = ?")
                .bind(username)
                .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    /// Counts failed attempts within the trailing `window_minutes` window.
    /// Used to decide whether the account is currently locked out.
    pub async fn recent_failed_login_count(
        &self,
        username: &str,
        window_minutes: i64,
    ) -> AppResult<i64> {
        let since = now_ts() - window_minutes * 60;
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM failed_logins WHERE username = ? AND attempted_at > ?",
        )
        .bind(username)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| crate::error::AppError::from_sqlx(e, true))?;
        Ok(row.0)
    }

    /// Timestamp of the most recent failed attempt, if any — used to compute
    /// when a lockout expires.
    pub async fn last_failed_login_at(&self, username: &str) -> AppResult<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT attempted_at FROM failed_logins WHERE username = ? ORDER BY attempted_at DESC LIMIT 1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| crate::error::AppError::from_sqlx(e, true))?;
        Ok(row.map(|r| r.0))
    }
}
