// tests/ask_flow_test.rs
// End-to-end query flow: ingest a document, then ask a question against it
// under both local (RAG-enabled) and cloud/no-rag provider configurations.

use std::sync::Arc;

use async_trait::async_trait;
use sanctum::ask::AskOrchestrator;
use sanctum::error::AppResult;
use sanctum::ingest::Ingester;
use sanctum::provider::{Message, Provider, TokenStream};
use sanctum::provider_manager::ProviderManager;
use sanctum::rag::RagEnforcer;
use sanctum::store::Store;

/// Echoes the question length as an "embedding" and answers with a fixed
/// sentence naming whatever context it was given, so tests can tell
/// whether retrieved context made it into the prompt.
struct EchoProvider {
    local: bool,
}

#[async_trait]
impl Provider for EchoProvider {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        Ok(vec![text.len() as f32, 1.0])
    }

    async fn stream(&self, messages: &[Message]) -> AppResult<TokenStream> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let saw_context = last.contains("mountain");
        let reply = if saw_context {
            "answer: found mountain context".to_string()
        } else {
            "answer: no context".to_string()
        };
        Ok(Box::pin(futures::stream::iter(vec![Ok(reply)])))
    }

    fn name(&self) -> String {
        if self.local { "echo-local".into() } else { "echo-cloud".into() }
    }

    fn is_local(&self) -> bool {
        self.local
    }
}

async fn setup() -> (Arc<Store>, Ingester) {
    let store = Arc::new(Store::open("sqlite::memory:").await.unwrap());
    store
        .create_user("u1", "alice", "hash", false)
        .await
        .unwrap();
    let ingester = Ingester::new(
        store.clone(),
        sanctum::config::GuardrailsConfig::default(),
        false,
    );
    (store, ingester)
}

#[tokio::test]
async fn local_mode_retrieves_and_injects_context() {
    let (store, ingester) = setup().await;
    let local = Arc::new(EchoProvider { local: true }) as Arc<dyn Provider>;
    ingester
        .ingest_text(
            local.as_ref(),
            "u1",
            "hike.md",
            "the mountain trail is steep",
            &[],
        )
        .await
        .unwrap();

    let providers = ProviderManager::from_providers(Some(local), None, true);
    let rag = RagEnforcer::new(&sanctum::config::AppConfig {
        user_mode: sanctum::config::UserMode::Single,
        auth: sanctum::config::AuthConfig::default(),
        privacy: sanctum::config::PrivacyConfig {
            default_to_local: true,
            cloud_rag_policy: sanctum::config::CloudRagPolicy::NoRag,
        },
        local_provider: None,
        cloud_provider: None,
        guardrails: sanctum::config::GuardrailsConfig::default(),
        folders: vec![],
        database_url: "sqlite::memory:".into(),
    });

    let orchestrator = AskOrchestrator::new(&store, &providers, &rag);
    let mut streamed = String::new();
    let outcome = orchestrator
        .ask("u1", None, "what is the trail like", |tok| streamed.push_str(tok))
        .await
        .unwrap();

    assert_eq!(outcome.rag_status, "RAG Enabled (Local)");
    assert!(outcome.answer.contains("found mountain context"));
    assert_eq!(streamed, outcome.answer);
}

#[tokio::test]
async fn cloud_no_rag_policy_skips_retrieval() {
    let (store, ingester) = setup().await;
    let local = Arc::new(EchoProvider { local: true }) as Arc<dyn Provider>;
    ingester
        .ingest_text(local.as_ref(), "u1", "hike.md", "the mountain trail is steep", &[])
        .await
        .unwrap();

    let cloud = Arc::new(EchoProvider { local: false }) as Arc<dyn Provider>;
    let providers = ProviderManager::from_providers(None, Some(cloud), false);
    let rag = RagEnforcer::new(&sanctum::config::AppConfig {
        user_mode: sanctum::config::UserMode::Single,
        auth: sanctum::config::AuthConfig::default(),
        privacy: sanctum::config::PrivacyConfig {
            default_to_local: false,
            cloud_rag_policy: sanctum::config::CloudRagPolicy::NoRag,
        },
        local_provider: None,
        cloud_provider: None,
        guardrails: sanctum::config::GuardrailsConfig::default(),
        folders: vec![],
        database_url: "sqlite::memory:".into(),
    });

    let orchestrator = AskOrchestrator::new(&store, &providers, &rag);
    let outcome = orchestrator
        .ask("u1", None, "what is the trail like", |_| {})
        .await
        .unwrap();

    assert_eq!(outcome.rag_status, "RAG Disabled (Cloud Policy)");
    assert!(outcome.answer.contains("no context"));
}

#[tokio::test]
async fn second_user_cannot_use_first_users_session() {
    let (store, _ingester) = setup().await;
    store.create_user("u2", "bob", "hash", false).await.unwrap();

    let local = Arc::new(EchoProvider { local: true }) as Arc<dyn Provider>;
    let providers = ProviderManager::from_providers(Some(local), None, true);
    let rag = RagEnforcer::new(&sanctum::config::AppConfig {
        user_mode: sanctum::config::UserMode::Single,
        auth: sanctum::config::AuthConfig::default(),
        privacy: sanctum::config::PrivacyConfig {
            default_to_local: true,
            cloud_rag_policy: sanctum::config::CloudRagPolicy::AllowRag,
        },
        local_provider: None,
        cloud_provider: None,
        guardrails: sanctum::config::GuardrailsConfig::default(),
        folders: vec![],
        database_url: "sqlite::memory:".into(),
    });
    let orchestrator = AskOrchestrator::new(&store, &providers, &rag);

    let first = orchestrator.ask("u1", None, "hello", |_| {}).await.unwrap();
    let result = orchestrator
        .ask("u2", Some(&first.session_id), "hello again", |_| {})
        .await;

    assert!(matches!(result, Err(sanctum::error::AppError::Forbidden)));
}
