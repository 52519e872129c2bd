// src/store/tokens.rs
// Opaque session tokens: stored and revocable server-side rather than a
// stateless signed JWT, so a compromised token can be killed immediately.

use rand::RngCore;

use super::models::now_ts;
use super::{with_busy_retry, Store};
use crate::error::{AppError, AppResult};

/// Generates a fresh 256-bit random token, url-safe base64 encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

impl Store {
    pub async fn create_session_token(
        &self,
        user_id: &str,
        expiry_days: i64,
    ) -> AppResult<String> {
        let token = generate_token();
        let expires_at = now_ts() + expiry_days * 86_400;
        with_busy_retry(|| {
            sqlx::query("INSERT INTO session_tokens (token, user_id, expires_at) VALUES (?, ?, ?)")
                .bind(&token)
                .bind(user_id)
                .bind(expires_at)
                .execute(&self.pool)
        })
        .await?;
        Ok(token)
    }

    /// Resolves a bearer token to a user id, rejecting missing or expired
    /// tokens uniformly as `Unauthorized` so callers can't distinguish the
    /// two cases.
    pub async fn resolve_session_token(&self, token: &str) -> AppResult<String> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT user_id, expires_at FROM session_tokens WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::from_sqlx(e, true))?;

        match row {
            Some((user_id, expires_at)) if expires_at > now_ts() => Ok(user_id),
            _ => Err(AppError::Unauthorized),
        }
    }

    pub async fn revoke_session_token(&self, token: &str) -> AppResult<()> {
        with_busy_retry(|| {
            sqlx::query("DELETE FROM session_tokens WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    pub async fn revoke_all_sessions_for_user(&self, user_id: &str) -> AppResult<()> {
        with_busy_retry(|| {
            sqlx::query("DELETE FROM session_tokens WHERE user_id = ?")
                .bind(user_id)
                .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> AppResult<u64> {
        let result = with_busy_retry(|| {
            sqlx::query("DELETE FROM session_tokens WHERE expires_at <= ?")
                .bind(now_ts())
                .execute(&self.pool)
        })
        .await?;
        Ok(result.rows_affected())
    }
}
