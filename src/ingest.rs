// src/ingest.rs
// Ingester: guardrails -> chunker -> embedding provider -> data store,
// bounded by a semaphore so a burst of concurrent ingestion calls can't
// overwhelm the embedding backend.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::chunker::{chunk_text, ChunkerConfig};
use crate::config::GuardrailsConfig;
use crate::error::{AppError, AppResult};
use crate::guardrails::Guardrails;
use crate::provider::Provider;
use crate::store::models::Visibility;
use crate::store::Store;

pub struct IngestSummary {
    pub source: String,
    pub chunks_written: usize,
    pub pii_marker: Option<&'static str>,
}

pub struct Ingester {
    store: Arc<Store>,
    guardrails_config: GuardrailsConfig,
    privacy_mode: bool,
    semaphore: Arc<Semaphore>,
    chunker_config: ChunkerConfig,
}

impl Ingester {
    pub fn new(store: Arc<Store>, guardrails_config: GuardrailsConfig, privacy_mode: bool) -> Self {
        let permits = guardrails_config.max_concurrent.max(1);
        Self {
            store,
            guardrails_config,
            privacy_mode,
            semaphore: Arc::new(Semaphore::new(permits)),
            chunker_config: ChunkerConfig::default(),
        }
    }

    /// Ingests raw text under `source`, tagged with `tags`. On any chunk's
    /// embedding call failing, the whole source is dropped rather than
    /// partially written.
    pub async fn ingest_text(
        &self,
        provider: &dyn Provider,
        user_id: &str,
        source: &str,
        text: &str,
        tags: &[String],
    ) -> AppResult<IngestSummary> {
        let guardrails = Guardrails::new(&self.guardrails_config, self.privacy_mode);
        guardrails.check_size(text.len() as u64)?;
        let looks_like_url = source.starts_with("http://") || source.starts_with("https://");
        if !looks_like_url && source.contains('.') {
            guardrails.check_extension(source)?;
        }
        let pii_outcome = guardrails.check_pii(text)?;

        let chunks = chunk_text(text, self.chunker_config);
        if chunks.is_empty() {
            self.store
                .append_audit("ingest", &format!("{source}: 0 chunks (empty input)"), user_id)
                .await?;
            return Ok(IngestSummary {
                source: source.to_string(),
                chunks_written: 0,
                pii_marker: pii_outcome.pii_marker,
            });
        }

        let embeddings = self.embed_all(provider, &chunks).await?;

        let summary = self
            .summarize_source(provider, &chunks)
            .await
            .unwrap_or(None);
        let summary_with_marker = match (summary, pii_outcome.pii_marker) {
            (Some(s), Some(marker)) => Some(format!("{s} [pii: {marker}]")),
            (Some(s), None) => Some(s),
            (None, Some(marker)) => Some(format!("[pii: {marker}]")),
            (None, None) => None,
        };

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            self.store
                .insert_chunk(
                    user_id,
                    source,
                    chunk,
                    embedding,
                    tags,
                    summary_with_marker.as_deref(),
                    Visibility::Private,
                )
                .await?;
        }

        self.store
            .append_audit(
                "ingest",
                &format!("{source}: {} chunks", chunks.len()),
                user_id,
            )
            .await?;
        info!(user_id, source, chunks = chunks.len(), "document ingested");

        Ok(IngestSummary {
            source: source.to_string(),
            chunks_written: chunks.len(),
            pii_marker: pii_outcome.pii_marker,
        })
    }

    /// Reads `path` from disk — extracting text from PDFs rather than
    /// feeding their binary bytes through the chunker — and ingests the
    /// result under the path as its source key.
    pub async fn ingest_file(
        &self,
        provider: &dyn Provider,
        user_id: &str,
        path: &Path,
        tags: &[String],
    ) -> AppResult<IngestSummary> {
        let source = path.to_string_lossy().to_string();
        let text = read_file_text(path).await?;
        self.ingest_text(provider, user_id, &source, &text, tags).await
    }

    /// A thin adapter: fetch, re-check guardrails against the fetched body,
    /// delegate to the text path.
    pub async fn ingest_url(
        &self,
        provider: &dyn Provider,
        user_id: &str,
        url: &str,
        tags: &[String],
    ) -> AppResult<IngestSummary> {
        let guardrails = Guardrails::new(&self.guardrails_config, self.privacy_mode);
        guardrails.check_url_allowed()?;

        let body = reqwest::get(url)
            .await
            .map_err(|e| AppError::InvalidInput(format!("fetching url: {e}")))?
            .text()
            .await
            .map_err(|e| AppError::InvalidInput(format!("reading url body: {e}")))?;

        self.ingest_text(provider, user_id, url, &body, tags).await
    }

    /// Embeds every chunk concurrently, bounded by a semaphore of width
    /// `max_concurrent` shared across concurrent ingest calls. Order of the
    /// returned vector matches `chunks`' order even though completion order
    /// may differ.
    async fn embed_all(&self, provider: &dyn Provider, chunks: &[String]) -> AppResult<Vec<Vec<f32>>> {
        use futures::stream::{StreamExt, TryStreamExt};

        let in_flight: Vec<_> = chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| {
                let sem = self.semaphore.clone();
                let chunk = chunk.clone();
                async move {
                    let _permit = sem.acquire_owned().await.map_err(|_| AppError::Cancelled)?;
                    let embedding = provider.embed(&chunk).await?;
                    Ok::<(usize, Vec<f32>), AppError>((idx, embedding))
                }
            })
            .collect();

        let mut results: Vec<(usize, Vec<f32>)> = futures::stream::iter(in_flight)
            .buffer_unordered(chunks.len().max(1))
            .try_collect()
            .await?;
        results.sort_by_key(|(idx, _)| *idx);
        Ok(results.into_iter().map(|(_, v)| v).collect())
    }

    async fn summarize_source(
        &self,
        provider: &dyn Provider,
        chunks: &[String],
    ) -> AppResult<Option<String>> {
        if chunks.is_empty() {
            return Ok(None);
        }
        let joined = chunks.join("\n---\n");
        let truncated: String = joined.chars().take(4000).collect();
        let messages = vec![
            crate::provider::Message::system("Summarize the following document in one sentence."),
            crate::provider::Message::user(truncated),
        ];
        match provider.stream(&messages).await {
            Ok(stream) => {
                let (text, err) = crate::provider::drain_stream(stream, |_| {}).await;
                if let Some(e) = err {
                    warn!(error = %e, "per-source summary stream failed, leaving summary unset");
                    return Ok(None);
                }
                Ok(Some(text))
            }
            Err(e) => {
                warn!(error = %e, "per-source summary call failed, leaving summary unset");
                Ok(None)
            }
        }
    }

    pub async fn delete_source(&self, user_id: &str, source: &str) -> AppResult<()> {
        self.store.delete_source(user_id, source).await?;
        Ok(())
    }

    /// Validates a watched-folder path and a single file's extension/size
    /// before the caller hands it to `ingest_text` — used by the folder
    /// watcher.
    pub fn validate_watch_target(&self, path: &Path) -> AppResult<()> {
        let guardrails = Guardrails::new(&self.guardrails_config, self.privacy_mode);
        guardrails.check_watch_path(path)
    }
}

/// Reads a file as UTF-8 text, extracting the text layer first when the
/// extension is `.pdf` — PDF bytes aren't valid UTF-8 and would otherwise
/// fail `ingest_text`'s size/PII checks on garbage.
async fn read_file_text(path: &Path) -> AppResult<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if is_pdf {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text(&owned)
                .map_err(|e| AppError::InvalidInput(format!("extracting pdf text: {e}")))
        })
        .await
        .map_err(|e| AppError::StoreFatal(format!("pdf extraction task panicked: {e}")))?
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::InvalidInput(format!("reading file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::provider::{Message, TokenStream};

    struct StubProvider;

    #[async_trait]
    impl Provider for StubProvider {
        async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn stream(&self, _messages: &[Message]) -> AppResult<TokenStream> {
            Ok(Box::pin(futures::stream::iter(vec![Ok("summary".to_string())])))
        }

        fn name(&self) -> String {
            "stub".to_string()
        }

        fn is_local(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn empty_text_yields_zero_chunks_no_error() {
        let store = Arc::new(Store::open("sqlite::memory:").await.unwrap());
        store.create_user("u1", "alice", "h", false).await.unwrap();
        let ingester = Ingester::new(store, GuardrailsConfig::default(), false);
        let result = ingester
            .ingest_text(&StubProvider, "u1", "empty.md", "", &[])
            .await
            .unwrap();
        assert_eq!(result.chunks_written, 0);
    }

    #[tokio::test]
    async fn ingest_writes_chunks_and_library_entry() {
        let store = Arc::new(Store::open("sqlite::memory:").await.unwrap());
        store.create_user("u1", "alice", "h", false).await.unwrap();
        let ingester = Ingester::new(store.clone(), GuardrailsConfig::default(), false);

        let text = "word ".repeat(300);
        let result = ingester
            .ingest_text(&StubProvider, "u1", "doc.md", &text, &["tag1".to_string()])
            .await
            .unwrap();
        assert!(result.chunks_written > 0);

        let library = store.library_for_user("u1").await.unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library[0].chunk_count, result.chunks_written as i64);
    }

    #[tokio::test]
    async fn url_ingestion_rejected_in_privacy_mode() {
        let store = Arc::new(Store::open("sqlite::memory:").await.unwrap());
        store.create_user("u1", "alice", "h", false).await.unwrap();
        let ingester = Ingester::new(store, GuardrailsConfig::default(), true);
        let result = ingester
            .ingest_url(&StubProvider, "u1", "https://example.com", &[])
            .await;
        assert!(matches!(result, Err(AppError::GuardrailRejected { .. })));
    }
}
