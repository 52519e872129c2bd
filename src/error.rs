// src/error.rs
// Closed enumeration of error kinds surfaced across the core.
//
// Maps `sqlx` errors to a closed variant at the point of failure (e.g. a
// UNIQUE constraint violation becomes `Conflict`) rather than leaving
// callers to sniff `Display` output for substrings like "UNIQUE constraint
// failed". Callers match on `AppError`, never on its rendered text.

use std::time::SystemTime;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("account locked until {until:?}")]
    Locked { until: SystemTime },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("guardrail rejected: {rule}")]
    GuardrailRejected { rule: String },

    #[error("provider unconfigured: {0}")]
    ProviderUnconfigured(String),

    #[error("provider upstream error: {0}")]
    ProviderUpstream(String),

    #[error("store busy, retry budget exhausted")]
    StoreTransient,

    #[error("store fatal error: {0}")]
    StoreFatal(String),

    #[error("cancelled")]
    Cancelled,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Maps a raw sqlx error into a closed kind, annotating unique-constraint
    /// violations as `Conflict` at the source instead of leaving callers to
    /// sniff the message text (see SPEC_FULL.md §7 / §9 REDESIGN FLAG).
    pub fn from_sqlx(err: sqlx::Error, retried_out: bool) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return AppError::Conflict(db_err.message().to_string());
            }
            if retried_out && db_err.code().as_deref() == Some("5") {
                // SQLITE_BUSY
                return AppError::StoreTransient;
            }
        }
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::StoreFatal(other.to_string()),
        }
    }
}
