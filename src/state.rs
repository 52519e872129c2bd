// src/state.rs
// Application state: the set of long-lived services wired together at
// startup, one struct holding `Arc<Service>` for everything `main.rs`
// constructs once.

use std::sync::Arc;

use tracing::info;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::ingest::Ingester;
use crate::provider_manager::ProviderManager;
use crate::rag::RagEnforcer;
use crate::store::Store;
use crate::watcher::WatcherService;

/// Services shared across the core. `config` and `store` are held
/// independently of the composite services so call sites that only need
/// configuration or raw persistence don't have to reach through the whole
/// struct.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<Store>,
    pub providers: Arc<ProviderManager>,
    pub rag: Arc<RagEnforcer>,
    pub ingester: Arc<Ingester>,
}

impl AppState {
    pub async fn bootstrap(config: AppConfig) -> AppResult<Self> {
        let store = Arc::new(Store::open(&config.database_url).await?);
        let providers = Arc::new(ProviderManager::new(&config));
        let rag = Arc::new(RagEnforcer::new(&config));
        let privacy_mode = config.privacy.default_to_local;
        let ingester = Arc::new(Ingester::new(
            store.clone(),
            config.guardrails.clone(),
            privacy_mode,
        ));

        sync_watched_folders(&store, &config.folders).await?;

        info!(user_mode = ?config.user_mode, "application state bootstrapped");

        Ok(Self {
            config,
            store,
            providers,
            rag,
            ingester,
        })
    }

    pub fn auth_service(&self) -> AuthService<'_> {
        AuthService::new(&self.store, &self.config.auth)
    }

    /// Starts the folder watcher over the services already wired into this
    /// state, returning the handle so callers can stop it on shutdown.
    pub fn spawn_watcher(&self) -> WatcherService {
        WatcherService::new(self.store.clone(), self.ingester.clone(), self.providers.clone())
    }

    pub fn reload_config(&mut self, config: AppConfig) {
        self.providers.reload(&config);
        self.rag.reload(&config);
        self.config = config;
    }
}

/// Inserts any folder listed in config that isn't already a persisted watch
/// target, so a restart doesn't produce duplicate rows for the same
/// (user, path) pair.
async fn sync_watched_folders(
    store: &Store,
    folders: &[crate::config::FolderConfig],
) -> AppResult<()> {
    let existing = store.list_watched_folders().await?;
    for folder in folders {
        if !folder.active {
            continue;
        }
        let already_watched = existing
            .iter()
            .any(|w| w.user_id == folder.user_id && w.path == folder.path);
        if !already_watched {
            store.add_watched_folder(&folder.user_id, &folder.path).await?;
        }
    }
    Ok(())
}
