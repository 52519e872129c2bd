// src/provider/cloud_openai.rs
// Cloud provider targeting the OpenAI chat-completions and embeddings
// endpoints.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Message, Provider, TokenStream};
use crate::error::{AppError, AppResult};

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    chat_model: String,
    embed_model: String,
    base_url: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatChunk {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    delta: ChatDelta,
}

#[derive(Deserialize, Default)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(api_key: String, chat_model: String, embed_model: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            chat_model,
            embed_model,
            base_url,
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if self.api_key.is_empty() {
            return Err(AppError::ProviderUnconfigured("openai api key missing".into()));
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&json!({ "model": self.embed_model, "input": text }))
            .send()
            .await
            .map_err(|e| AppError::ProviderUpstream(format!("openai embed request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderUpstream(format!(
                "openai embed failed ({status}): {body}"
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderUpstream(format!("openai embed response: {e}")))?;
        let data = parsed
            .data
            .pop()
            .ok_or_else(|| AppError::ProviderUpstream("openai embed response empty".into()))?;
        Ok(data.embedding)
    }

    async fn stream(&self, messages: &[Message]) -> AppResult<TokenStream> {
        if self.api_key.is_empty() {
            return Err(AppError::ProviderUnconfigured("openai api key missing".into()));
        }

        let payload_messages: Vec<ChatMessage> = messages
            .iter()
            .map(|m| ChatMessage {
                role: &m.role,
                content: &m.content,
            })
            .collect();

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&json!({
                "model": self.chat_model,
                "messages": payload_messages,
                "stream": true,
            }))
            .send()
            .await
            .map_err(|e| AppError::ProviderUpstream(format!("openai chat request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderUpstream(format!(
                "openai chat failed ({status}): {body}"
            )));
        }

        let byte_stream = response.bytes_stream();
        let stream = byte_stream.flat_map(|result| {
            let tokens: Vec<AppResult<String>> = match result {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes).to_string();
                    super::sse::extract_data_lines(&text)
                        .into_iter()
                        .filter_map(|data| serde_json::from_str::<ChatChunk>(data).ok())
                        .filter_map(|chunk| chunk.choices.into_iter().next())
                        .filter_map(|choice| choice.delta.content)
                        .filter(|c| !c.is_empty())
                        .map(Ok)
                        .collect()
                }
                Err(e) => vec![Err(AppError::ProviderUpstream(format!(
                    "openai stream error: {e}"
                )))],
            };
            futures::stream::iter(tokens)
        });

        Ok(Box::pin(stream))
    }

    fn name(&self) -> String {
        format!("OpenAI ({})", self.chat_model)
    }

    fn is_local(&self) -> bool {
        false
    }
}
