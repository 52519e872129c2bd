// src/store/audit.rs
// Append-only audit log: every guardrail rejection, ingestion, auth event
// and provider switch gets a row here.

use super::models::{now_ts, AuditEntry};
use super::{with_busy_retry, Store};
use crate::error::{AppError, AppResult};

impl Store {
    pub async fn append_audit(&self, op_type: &str, details: &str, user_ctx: &str) -> AppResult<()> {
        with_busy_retry(|| {
            sqlx::query(
                "INSERT INTO audit_log (op_type, details, user_ctx, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(op_type)
            .bind(details)
            .bind(user_ctx)
            .bind(now_ts())
            .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    pub async fn recent_audit(&self, limit: i64) -> AppResult<Vec<AuditEntry>> {
        sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM audit_log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx(e, true))
    }

    pub async fn audit_for_user(&self, user_ctx: &str, limit: i64) -> AppResult<Vec<AuditEntry>> {
        sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM audit_log WHERE user_ctx = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_ctx)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx(e, true))
    }
}
