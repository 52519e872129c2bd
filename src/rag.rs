// src/rag.rs
// RAG Enforcer: a single decision function over (is_local_active,
// cloud_rag_policy), reloaded the same way the provider manager is.

use parking_lot::RwLock;

use crate::config::{AppConfig, CloudRagPolicy};
use crate::provider_manager::ProviderManager;

pub struct RagEnforcer {
    cloud_rag_policy: RwLock<CloudRagPolicy>,
}

impl RagEnforcer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            cloud_rag_policy: RwLock::new(config.privacy.cloud_rag_policy),
        }
    }

    pub fn reload(&self, config: &AppConfig) {
        *self.cloud_rag_policy.write() = config.privacy.cloud_rag_policy;
    }

    /// Local mode always retrieves; in cloud mode retrieval follows the
    /// configured policy.
    pub fn should_perform_rag(&self, is_local_active: bool) -> bool {
        if is_local_active {
            return true;
        }
        matches!(*self.cloud_rag_policy.read(), CloudRagPolicy::AllowRag)
    }

    pub fn get_rag_status(&self, is_local_active: bool) -> &'static str {
        if is_local_active {
            "RAG Enabled (Local)"
        } else if matches!(*self.cloud_rag_policy.read(), CloudRagPolicy::AllowRag) {
            "RAG Enabled (Cloud)"
        } else {
            "RAG Disabled (Cloud Policy)"
        }
    }
}

/// Convenience wrapper combining the enforcer's decision with the manager's
/// current mode, since every caller needs both together.
pub fn should_perform_rag(enforcer: &RagEnforcer, providers: &ProviderManager) -> bool {
    enforcer.should_perform_rag(providers.is_local_mode())
}
