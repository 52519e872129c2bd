// src/config/privacy.rs

use serde::{Deserialize, Serialize};

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudRagPolicy {
    NoRag,
    AllowRag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    #[serde(default)]
    pub default_to_local: bool,
    pub cloud_rag_policy: CloudRagPolicy,
}

impl PrivacyConfig {
    /// `cloud_rag_policy` is validated on load; any value other than the two
    /// variants above is a fatal config error — serde already rejects
    /// unknown strings, so this only needs to exist for symmetry with the
    /// rest of the config tree's `validate()` calls.
    pub fn validate(&self) -> AppResult<()> {
        let _ = self.cloud_rag_policy;
        Ok(())
    }
}
