// src/config/mod.rs
// Central configuration, loaded from a TOML file on disk and threaded
// explicitly into the services that need it rather than read from a global.

pub mod auth;
pub mod folders;
pub mod guardrails;
pub mod privacy;
pub mod providers;

pub use auth::AuthConfig;
pub use folders::FolderConfig;
pub use guardrails::{GuardrailsConfig, PiiMode};
pub use privacy::{CloudRagPolicy, PrivacyConfig};
pub use providers::{CloudProviderConfig, LocalProviderConfig};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserMode {
    Single,
    Multi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub user_mode: UserMode,
    pub auth: AuthConfig,
    pub privacy: PrivacyConfig,
    pub local_provider: Option<LocalProviderConfig>,
    pub cloud_provider: Option<CloudProviderConfig>,
    pub guardrails: GuardrailsConfig,
    #[serde(default)]
    pub folders: Vec<FolderConfig>,
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_database_url() -> String {
    "sqlite://sanctum.db".to_string()
}

impl AppConfig {
    /// Loads configuration from a TOML file, then lets a handful of secrets
    /// be overridden by environment variables so API keys never need to be
    /// committed to the config file.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::InvalidInput(format!("reading config file: {e}")))?;
        let mut cfg: AppConfig = toml::from_str(&raw)
            .map_err(|e| AppError::InvalidInput(format!("parsing config file: {e}")))?;

        if let Some(ref mut cloud) = cfg.cloud_provider {
            cloud.apply_env_overrides();
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// A malformed or internally inconsistent config is a fatal startup
    /// error; the caller maps it to a non-zero process exit status.
    pub fn validate(&self) -> AppResult<()> {
        self.privacy.validate()?;
        self.guardrails.validate()?;
        if self.user_mode == UserMode::Multi && self.auth.provider != "userpass" {
            return Err(AppError::InvalidInput(format!(
                "auth.provider {:?} is not implemented",
                self.auth.provider
            )));
        }
        for folder in &self.folders {
            folder.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_cloud_rag_policy() {
        let toml = r#"
            user_mode = "single"
            database_url = "sqlite::memory:"

            [auth]
            provider = "userpass"
            session_expiry_days = 30
            lockout_threshold = 5
            lockout_duration_minutes = 15

            [privacy]
            default_to_local = true
            cloud_rag_policy = "sometimes"

            [guardrails]
            pii_detection = "off"
            max_file_size_mb = 20
            max_concurrent = 4
        "#;
        let cfg: AppConfig = toml::from_str(toml).unwrap();
        assert!(cfg.validate().is_err());
    }
}
