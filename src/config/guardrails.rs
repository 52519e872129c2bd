// src/config/guardrails.rs

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiMode {
    Off,
    Normal,
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    #[serde(default = "default_pii_detection")]
    pub pii_detection: PiiMode,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_pii_detection() -> PiiMode {
    PiiMode::Normal
}
fn default_max_file_size_mb() -> u64 {
    25
}
fn default_max_concurrent() -> usize {
    4
}
fn default_allowed_extensions() -> Vec<String> {
    vec![".txt".into(), ".md".into(), ".pdf".into()]
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            pii_detection: default_pii_detection(),
            max_file_size_mb: default_max_file_size_mb(),
            max_concurrent: default_max_concurrent(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl GuardrailsConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent == 0 {
            return Err(AppError::InvalidInput(
                "guardrails.max_concurrent must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
