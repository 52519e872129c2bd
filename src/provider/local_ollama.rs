// src/provider/local_ollama.rs
// Local provider targeting a self-hosted Ollama instance: newline-delimited
// JSON streaming, request/response shape adapted to Ollama's
// `/api/embeddings` and `/api/chat` endpoints.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Message, Provider, TokenStream};
use crate::config::LocalProviderConfig;
use crate::error::{AppError, AppResult};

pub struct OllamaProvider {
    client: Client,
    endpoint: String,
    embed_model: String,
    chat_model: String,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OllamaChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    message: Option<OllamaChatChunkMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct OllamaChatChunkMessage {
    #[serde(default)]
    content: String,
}

impl OllamaProvider {
    pub fn new(config: &LocalProviderConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.ollama_endpoint.trim_end_matches('/').to_string(),
            embed_model: config.ollama_embed_model.clone(),
            chat_model: config.ollama_chat_model.clone(),
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.endpoint))
            .json(&json!({ "model": self.embed_model, "prompt": text }))
            .send()
            .await
            .map_err(|e| AppError::ProviderUpstream(format!("ollama embed request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderUpstream(format!(
                "ollama embed failed ({status}): {body}"
            )));
        }

        let parsed: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderUpstream(format!("ollama embed response: {e}")))?;
        Ok(parsed.embedding)
    }

    async fn stream(&self, messages: &[Message]) -> AppResult<TokenStream> {
        let payload_messages: Vec<OllamaChatMessage> = messages
            .iter()
            .map(|m| OllamaChatMessage {
                role: &m.role,
                content: &m.content,
            })
            .collect();

        let response = self
            .client
            .post(format!("{}/api/chat", self.endpoint))
            .json(&json!({
                "model": self.chat_model,
                "messages": payload_messages,
                "stream": true,
            }))
            .send()
            .await
            .map_err(|e| AppError::ProviderUpstream(format!("ollama chat request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderUpstream(format!(
                "ollama chat failed ({status}): {body}"
            )));
        }

        let byte_stream = response.bytes_stream();
        let stream = byte_stream.flat_map(|result| {
            let tokens: Vec<AppResult<String>> = match result {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes).to_string();
                    super::sse::extract_ndjson_lines(&text)
                        .into_iter()
                        .filter_map(|line| serde_json::from_str::<OllamaChatChunk>(line).ok())
                        .filter(|chunk| !chunk.done)
                        .filter_map(|chunk| chunk.message.map(|m| m.content))
                        .filter(|c| !c.is_empty())
                        .map(Ok)
                        .collect()
                }
                Err(e) => vec![Err(AppError::ProviderUpstream(format!(
                    "ollama stream error: {e}"
                )))],
            };
            futures::stream::iter(tokens)
        });

        Ok(Box::pin(stream))
    }

    fn name(&self) -> String {
        format!("Ollama ({})", self.chat_model)
    }

    fn is_local(&self) -> bool {
        true
    }
}
