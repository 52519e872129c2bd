// src/provider/cloud_anthropic.rs
// Cloud provider targeting the Anthropic Messages API. Anthropic
// has no embeddings endpoint, so `embed` surfaces a configuration error
// rather than guessing at a substitute — a provider slot filled with this
// type can serve chat but can never be selected for the embedding half of
// the pipeline in `default_to_local = false` mode.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Message, Provider, TokenStream};
use crate::error::{AppError, AppResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    chat_model: String,
    base_url: String,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum AnthropicEvent {
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: AnthropicDelta },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicDelta {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(api_key: String, chat_model: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            chat_model,
            base_url,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn embed(&self, _text: &str) -> AppResult<Vec<f32>> {
        Err(AppError::ProviderUnconfigured(
            "anthropic provider does not implement embeddings".into(),
        ))
    }

    async fn stream(&self, messages: &[Message]) -> AppResult<TokenStream> {
        if self.api_key.is_empty() {
            return Err(AppError::ProviderUnconfigured(
                "anthropic api key missing".into(),
            ));
        }

        let system: String = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let turns: Vec<AnthropicMessage> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| AnthropicMessage {
                role: &m.role,
                content: &m.content,
            })
            .collect();

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": self.chat_model,
                "system": system,
                "messages": turns,
                "max_tokens": 4096,
                "stream": true,
            }))
            .send()
            .await
            .map_err(|e| AppError::ProviderUpstream(format!("anthropic chat request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderUpstream(format!(
                "anthropic chat failed ({status}): {body}"
            )));
        }

        let byte_stream = response.bytes_stream();
        let stream = byte_stream.flat_map(|result| {
            let tokens: Vec<AppResult<String>> = match result {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes).to_string();
                    super::sse::extract_data_lines(&text)
                        .into_iter()
                        .filter_map(|data| serde_json::from_str::<AnthropicEvent>(data).ok())
                        .filter_map(|event| match event {
                            AnthropicEvent::ContentBlockDelta { delta } => delta.text,
                            AnthropicEvent::Other => None,
                        })
                        .filter(|c| !c.is_empty())
                        .map(Ok)
                        .collect()
                }
                Err(e) => vec![Err(AppError::ProviderUpstream(format!(
                    "anthropic stream error: {e}"
                )))],
            };
            futures::stream::iter(tokens)
        });

        Ok(Box::pin(stream))
    }

    fn name(&self) -> String {
        format!("Anthropic ({})", self.chat_model)
    }

    fn is_local(&self) -> bool {
        false
    }
}
