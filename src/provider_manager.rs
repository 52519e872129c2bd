// src/provider_manager.rs
// Provider manager: holds up to one local and one cloud provider instance
// plus a live config snapshot, with atomic reload.
//
// A central point owning provider selection, using a simple local/cloud
// slot model rather than classifier-driven multi-provider routing. Readers
// never see a torn mix of old/new config because both slots and the mode
// flag live in one `Slots` struct swapped as a unit under a single
// `parking_lot::RwLock`.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{AppConfig, CloudProviderConfig};
use crate::error::{AppError, AppResult};
use crate::provider::{AnthropicProvider, OllamaProvider, OpenAiProvider, Provider};

struct Slots {
    local: Option<Arc<dyn Provider>>,
    cloud: Option<Arc<dyn Provider>>,
    default_to_local: bool,
}

pub struct ProviderManager {
    slots: RwLock<Slots>,
}

impl ProviderManager {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            slots: RwLock::new(Self::build_slots(config)),
        }
    }

    /// Builds a manager directly from already-constructed providers,
    /// bypassing config-driven construction. Exists for tests that need to
    /// wire in a stub provider instead of a real Ollama/OpenAI/Anthropic
    /// client.
    pub fn from_providers(
        local: Option<Arc<dyn Provider>>,
        cloud: Option<Arc<dyn Provider>>,
        default_to_local: bool,
    ) -> Self {
        Self {
            slots: RwLock::new(Slots {
                local,
                cloud,
                default_to_local,
            }),
        }
    }

    fn build_slots(config: &AppConfig) -> Slots {
        let local = config
            .local_provider
            .as_ref()
            .map(|c| Arc::new(OllamaProvider::new(c)) as Arc<dyn Provider>);

        let cloud = config.cloud_provider.as_ref().map(|c| match c {
            CloudProviderConfig::Openai {
                openai_api_key,
                openai_chat_model,
                openai_embed_model,
                openai_base_url,
            } => Arc::new(OpenAiProvider::new(
                openai_api_key.clone(),
                openai_chat_model.clone(),
                openai_embed_model.clone(),
                openai_base_url.clone(),
            )) as Arc<dyn Provider>,
            CloudProviderConfig::Anthropic {
                anthropic_api_key,
                anthropic_chat_model,
                anthropic_base_url,
            } => Arc::new(AnthropicProvider::new(
                anthropic_api_key.clone(),
                anthropic_chat_model.clone(),
                anthropic_base_url.clone(),
            )) as Arc<dyn Provider>,
        });

        Slots {
            local,
            cloud,
            default_to_local: config.privacy.default_to_local,
        }
    }

    /// Atomically swaps both slots: concurrent readers see either the old
    /// pair or the new pair, never a mix.
    pub fn reload(&self, config: &AppConfig) {
        let new_slots = Self::build_slots(config);
        *self.slots.write() = new_slots;
    }

    /// `default_to_local` doubles as the privacy-mode switch: the config
    /// surface exposes one flag, not two.
    pub fn is_local_mode(&self) -> bool {
        let slots = self.slots.read();
        slots.default_to_local && slots.local.is_some()
    }

    pub fn get_local_provider(&self) -> Option<Arc<dyn Provider>> {
        self.slots.read().local.clone()
    }

    pub fn get_cloud_provider(&self) -> Option<Arc<dyn Provider>> {
        self.slots.read().cloud.clone()
    }

    /// Picks the local provider iff `default_to_local` is set; otherwise
    /// the cloud provider. Errors "not configured" if the selected slot is
    /// empty.
    pub fn get_active_provider(&self) -> AppResult<Arc<dyn Provider>> {
        let slots = self.slots.read();

        if slots.default_to_local {
            slots
                .local
                .clone()
                .ok_or_else(|| AppError::ProviderUnconfigured("no local provider configured".into()))
        } else {
            slots
                .cloud
                .clone()
                .ok_or_else(|| AppError::ProviderUnconfigured("no cloud provider configured".into()))
        }
    }

    pub fn get_provider_name(&self) -> AppResult<String> {
        Ok(self.get_active_provider()?.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AuthConfig, GuardrailsConfig, LocalProviderConfig, PrivacyConfig, UserMode,
    };

    fn base_config() -> AppConfig {
        AppConfig {
            user_mode: UserMode::Single,
            auth: AuthConfig::default(),
            privacy: PrivacyConfig {
                default_to_local: true,
                cloud_rag_policy: crate::config::CloudRagPolicy::NoRag,
            },
            local_provider: Some(LocalProviderConfig {
                kind: "ollama".into(),
                ollama_endpoint: "http://localhost:11434".into(),
                ollama_embed_model: "nomic-embed-text".into(),
                ollama_chat_model: "llama3.2".into(),
            }),
            cloud_provider: None,
            guardrails: GuardrailsConfig::default(),
            folders: vec![],
            database_url: "sqlite::memory:".into(),
        }
    }

    #[test]
    fn unconfigured_slot_errors() {
        let mut cfg = base_config();
        cfg.local_provider = None;
        cfg.privacy.default_to_local = false;
        let mgr = ProviderManager::new(&cfg);
        assert!(matches!(
            mgr.get_active_provider(),
            Err(AppError::ProviderUnconfigured(_))
        ));
    }

    #[test]
    fn prefers_local_when_default_to_local() {
        let cfg = base_config();
        let mgr = ProviderManager::new(&cfg);
        assert!(mgr.is_local_mode());
        assert!(mgr.get_active_provider().unwrap().is_local());
    }

    #[test]
    fn reload_swaps_atomically() {
        let cfg = base_config();
        let mgr = ProviderManager::new(&cfg);
        assert!(mgr.get_active_provider().unwrap().is_local());

        let mut cloud_cfg = base_config();
        cloud_cfg.local_provider = None;
        cloud_cfg.privacy.default_to_local = false;
        cloud_cfg.cloud_provider = Some(CloudProviderConfig::Openai {
            openai_api_key: "key".into(),
            openai_chat_model: "gpt-4".into(),
            openai_embed_model: "text-embedding-3-large".into(),
            openai_base_url: "https://api.openai.com/v1".into(),
        });
        mgr.reload(&cloud_cfg);
        assert!(!mgr.get_active_provider().unwrap().is_local());
    }
}
