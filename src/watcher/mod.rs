// src/watcher/mod.rs
// Folder watcher: a single background loop translating OS file events into
// per-user ingestion calls.
//
// Uses plain `notify` rather than a debouncing wrapper (see DESIGN.md):
// this watches a handful of user-designated content folders, not a git
// working tree, so batching/cooldown bookkeeping for noisy checkouts has no
// counterpart here. The path-ownership registry and single-loop-per-service
// shape are a `WatchRegistry`/`WatcherService` split.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::ingest::Ingester;
use crate::provider_manager::ProviderManager;
use crate::store::Store;

const AUTO_INGEST_TAG: &str = "auto-ingested";

/// path → owning user id, longest-prefix match resolves a changed file to
/// its watch root.
#[derive(Default)]
pub struct WatchRegistry {
    roots: RwLock<HashMap<PathBuf, String>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: PathBuf, user_id: String) {
        self.roots.write().insert(path, user_id);
    }

    pub fn unregister(&self, path: &Path) {
        self.roots.write().remove(path);
    }

    /// Resolves the owning user for `path` by longest matching registered
    /// prefix. Unmatched paths return `None` and are silently dropped by
    /// the caller.
    pub fn resolve_owner(&self, path: &Path) -> Option<String> {
        self.roots
            .read()
            .iter()
            .filter(|(root, _)| path.starts_with(root))
            .max_by_key(|(root, _)| root.as_os_str().len())
            .map(|(_, user_id)| user_id.clone())
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots.read().keys().cloned().collect()
    }
}

pub struct WatcherService {
    store: Arc<Store>,
    ingester: Arc<Ingester>,
    providers: Arc<ProviderManager>,
    registry: Arc<WatchRegistry>,
    cancel: CancellationToken,
    _watcher: Option<RecommendedWatcher>,
}

impl WatcherService {
    pub fn new(store: Arc<Store>, ingester: Arc<Ingester>, providers: Arc<ProviderManager>) -> Self {
        Self {
            store,
            ingester,
            providers,
            registry: Arc::new(WatchRegistry::new()),
            cancel: CancellationToken::new(),
            _watcher: None,
        }
    }

    pub fn registry(&self) -> Arc<WatchRegistry> {
        self.registry.clone()
    }

    /// Loads persisted watched folders, registers each with the OS
    /// file-notification subsystem (refusing any that fails path
    /// guardrails), and spawns the single background event loop.
    pub async fn start(&mut self) -> AppResult<()> {
        let folders = self.store.list_watched_folders().await?;

        let (tx, rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res| {
                let _ = tx.send(res);
            })
            .map_err(|e| crate::error::AppError::StoreFatal(format!("creating watcher: {e}")))?;
        watcher
            .configure(Config::default())
            .map_err(|e| crate::error::AppError::StoreFatal(format!("configuring watcher: {e}")))?;

        for folder in &folders {
            let path = PathBuf::from(&folder.path);
            if self.ingester.validate_watch_target(&path).is_err() {
                warn!(path = %folder.path, "skipping watched folder that fails path guardrails");
                continue;
            }
            if let Err(e) = watcher.watch(&path, RecursiveMode::Recursive) {
                warn!(path = %folder.path, error = %e, "failed to register watch");
                continue;
            }
            self.registry.register(path, folder.user_id.clone());
        }

        self._watcher = Some(watcher);
        self.spawn_loop(rx);
        info!(folders = folders.len(), "folder watcher started");
        Ok(())
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    fn spawn_loop(&self, mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>) {
        let store = self.store.clone();
        let ingester = self.ingester.clone();
        let providers = self.providers.clone();
        let registry = self.registry.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let cancelled = cancel.cancelled_owned();
            tokio::pin!(cancelled);
            loop {
                tokio::select! {
                    _ = &mut cancelled => {
                        info!("folder watcher stopped");
                        break;
                    }
                    event = rx.recv() => {
                        match event {
                            Some(Ok(event)) => {
                                handle_event(&store, &ingester, &providers, &registry, event).await;
                            }
                            Some(Err(e)) => warn!(error = %e, "watch error"),
                            None => break,
                        }
                    }
                }
            }
        });
    }
}

fn handle_event<'a>(
    store: &'a Store,
    ingester: &'a Ingester,
    providers: &'a ProviderManager,
    registry: &'a WatchRegistry,
    event: Event,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        for path in &event.paths {
            let Some(user_id) = registry.resolve_owner(path) else {
                continue;
            };

            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) => {
                    let Ok(metadata) = tokio::fs::metadata(path).await else {
                        continue;
                    };
                    if !metadata.is_file() {
                        continue;
                    }

                    let provider = match providers.get_active_provider() {
                        Ok(p) => p,
                        Err(e) => {
                            warn!(error = %e, "no active provider, skipping auto-ingest");
                            continue;
                        }
                    };

                    let tags = vec![AUTO_INGEST_TAG.to_string()];
                    if let Err(e) = ingester
                        .ingest_file(provider.as_ref(), &user_id, path, &tags)
                        .await
                    {
                        debug!(?path, error = %e, "auto-ingest failed or file unreadable");
                    }
                }
                EventKind::Remove(_) => {
                    let source = path.to_string_lossy().to_string();
                    if let Err(e) = store.delete_source(&user_id, &source).await {
                        error!(error = %e, path = %source, "failed to delete source on removal event");
                    }
                }
                _ => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins() {
        let registry = WatchRegistry::new();
        registry.register(PathBuf::from("/data"), "outer-user".into());
        registry.register(PathBuf::from("/data/inner"), "inner-user".into());

        let owner = registry.resolve_owner(Path::new("/data/inner/file.md"));
        assert_eq!(owner, Some("inner-user".to_string()));

        let owner = registry.resolve_owner(Path::new("/data/file.md"));
        assert_eq!(owner, Some("outer-user".to_string()));
    }

    #[test]
    fn unmatched_path_returns_none() {
        let registry = WatchRegistry::new();
        registry.register(PathBuf::from("/data"), "user".into());
        assert_eq!(registry.resolve_owner(Path::new("/other/file.md")), None);
    }
}
