// src/provider/mod.rs
// Embedding/Chat Provider: one trait, three concrete variants, each
// returning a boxed token stream rather than a provider-specific type.

pub mod cloud_anthropic;
pub mod cloud_openai;
pub mod local_ollama;
pub mod sse;

pub use cloud_anthropic::AnthropicProvider;
pub use cloud_openai::OpenAiProvider;
pub use local_ollama::OllamaProvider;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

pub type TokenStream = Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Shared contract for both embedding and chat-completion backends. A
/// single type implements both concerns rather than splitting them across
/// separate traits.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
    async fn stream(&self, messages: &[Message]) -> AppResult<TokenStream>;
    fn name(&self) -> String;
    fn is_local(&self) -> bool;
}

/// Drains a provider's token stream, forwarding each token to `sink` as it
/// arrives and returning the concatenation. Stream errors are terminal:
/// whatever text was collected before the error is returned alongside it,
/// never replayed.
pub async fn drain_stream(
    mut stream: TokenStream,
    mut sink: impl FnMut(&str),
) -> (String, Option<crate::error::AppError>) {
    use futures::StreamExt;

    let mut full_text = String::new();
    while let Some(next) = stream.next().await {
        match next {
            Ok(token) => {
                sink(&token);
                full_text.push_str(&token);
            }
            Err(e) => return (full_text, Some(e)),
        }
    }
    (full_text, None)
}
