// src/config/auth.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_session_expiry_days")]
    pub session_expiry_days: i64,
    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: u32,
    #[serde(default = "default_lockout_duration_minutes")]
    pub lockout_duration_minutes: i64,
}

fn default_provider() -> String {
    "userpass".to_string()
}
fn default_session_expiry_days() -> i64 {
    30
}
fn default_lockout_threshold() -> u32 {
    5
}
fn default_lockout_duration_minutes() -> i64 {
    15
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            session_expiry_days: default_session_expiry_days(),
            lockout_threshold: default_lockout_threshold(),
            lockout_duration_minutes: default_lockout_duration_minutes(),
        }
    }
}
