// src/config/providers.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalProviderConfig {
    #[serde(rename = "type")]
    pub kind: String, // only "ollama" is implemented
    pub ollama_endpoint: String,
    pub ollama_embed_model: String,
    pub ollama_chat_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CloudProviderConfig {
    Openai {
        #[serde(default)]
        openai_api_key: String,
        openai_chat_model: String,
        openai_embed_model: String,
        #[serde(default = "default_openai_base_url")]
        openai_base_url: String,
    },
    Anthropic {
        #[serde(default)]
        anthropic_api_key: String,
        anthropic_chat_model: String,
        #[serde(default = "default_anthropic_base_url")]
        anthropic_base_url: String,
    },
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

impl CloudProviderConfig {
    /// API keys are never required in the file itself; `OPENAI_API_KEY` /
    /// `ANTHROPIC_API_KEY` env vars (loaded via `dotenvy`) win when set, so
    /// secrets never need to live in a committed config file.
    pub fn apply_env_overrides(&mut self) {
        match self {
            CloudProviderConfig::Openai { openai_api_key, .. } => {
                if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                    *openai_api_key = key;
                }
            }
            CloudProviderConfig::Anthropic {
                anthropic_api_key, ..
            } => {
                if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
                    *anthropic_api_key = key;
                }
            }
        }
    }
}
