// src/ask.rs
// Ask orchestrator: ties the searcher, provider manager, RAG enforcer,
// prompt building, and streaming together into the single operation that
// defines a "query".

use crate::error::{AppError, AppResult};
use crate::provider::{drain_stream, Message};
use crate::provider_manager::ProviderManager;
use crate::rag::RagEnforcer;
use crate::search::Searcher;
use crate::store::models::Role;
use crate::store::{ChatSession, Store};

const SYSTEM_PREAMBLE: &str = "You are a helpful assistant";
const SEARCH_K: usize = 5;

pub struct AskOutcome {
    pub session_id: String,
    pub provider_name: String,
    pub rag_status: &'static str,
    pub answer: String,
}

pub struct AskOrchestrator<'a> {
    store: &'a Store,
    providers: &'a ProviderManager,
    rag: &'a RagEnforcer,
}

impl<'a> AskOrchestrator<'a> {
    pub fn new(store: &'a Store, providers: &'a ProviderManager, rag: &'a RagEnforcer) -> Self {
        Self { store, providers, rag }
    }

    /// Runs one query end to end, forwarding streamed tokens to `sink` as
    /// they arrive. Returns the metadata an HTTP layer is expected to
    /// surface before the first byte, plus the final answer text.
    pub async fn ask(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        question: &str,
        mut sink: impl FnMut(&str),
    ) -> AppResult<AskOutcome> {
        if user_id.is_empty() {
            return Err(AppError::Unauthorized);
        }

        let session = self.resolve_session(user_id, session_id).await?;

        self.store
            .append_chat_message(&session.id, Role::User, question, "")
            .await?;
        self.store
            .append_audit("query", question, user_id)
            .await?;

        let provider = self.providers.get_active_provider()?;
        let is_local = self.providers.is_local_mode();
        let rag_status = self.rag.get_rag_status(is_local);

        let chunks = if self.rag.should_perform_rag(is_local) {
            let query_vec = provider.embed(question).await?;
            let searcher = Searcher::new(self.store);
            searcher.search(user_id, &query_vec, SEARCH_K).await?
        } else {
            Vec::new()
        };

        let prompt = build_prompt(question, &chunks);
        let messages = vec![Message::system(SYSTEM_PREAMBLE), Message::user(prompt)];

        let stream = provider.stream(&messages).await?;
        let (answer, stream_err) = drain_stream(stream, &mut sink).await;

        if let Some(err) = stream_err {
            sink(&format!("\n[error: {err}]"));
            return Ok(AskOutcome {
                session_id: session.id,
                provider_name: provider.name(),
                rag_status,
                answer,
            });
        }

        let provider_mode = if is_local { "local" } else { "cloud" };
        self.store
            .append_chat_message(&session.id, Role::Assistant, &answer, provider_mode)
            .await?;

        Ok(AskOutcome {
            session_id: session.id,
            provider_name: provider.name(),
            rag_status,
            answer,
        })
    }

    async fn resolve_session(&self, user_id: &str, session_id: Option<&str>) -> AppResult<ChatSession> {
        match session_id {
            Some(id) => self.store.require_session_owner(id, user_id).await,
            None => self.store.create_chat_session(user_id).await,
        }
    }
}

/// Builds the fixed prompt template: the `Context:` header is always
/// present, with numbered items only when `chunks` is non-empty.
fn build_prompt(question: &str, chunks: &[crate::store::SearchHit]) -> String {
    let mut out = String::from("You are a helpful assistant. Use the following context … Context:\n");
    for (i, chunk) in chunks.iter().enumerate() {
        out.push_str(&format!("[{}] Source: {}\n{}\n", i + 1, chunk.source, chunk.text));
    }
    out.push_str(&format!(
        "\nUser Question: {question}\n\nAnswer based on the context above:"
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SearchHit;

    #[test]
    fn prompt_has_context_header_even_when_empty() {
        let prompt = build_prompt("what is rust?", &[]);
        assert!(prompt.contains("Context:\n\nUser Question: what is rust?"));
    }

    #[test]
    fn prompt_numbers_chunks_in_order() {
        let chunks = vec![
            SearchHit { source: "a.md".into(), text: "alpha".into(), score: 0.9 },
            SearchHit { source: "b.md".into(), text: "beta".into(), score: 0.5 },
        ];
        let prompt = build_prompt("q", &chunks);
        assert!(prompt.contains("[1] Source: a.md\nalpha\n[2] Source: b.md\nbeta\n"));
    }
}
