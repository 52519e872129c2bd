// src/store/mod.rs
// Data store: durable, user-scoped persistence over one SQLite file, split
// into per-concern submodules (`users`, `tokens`, `chunks`, `chat`, ...)
// rather than one monolithic impl block.

pub mod audit;
pub mod chat;
pub mod chunks;
pub mod lockout;
pub mod models;
pub mod tokens;
pub mod users;
pub mod watched_folders;

pub use models::*;

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{AppError, AppResult};

const SCHEMA_VERSION: i64 = 1;
const BUSY_RETRY_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct Store {
    pub(crate) pool: SqlitePool,
}

impl Store {
    /// Opens (creating if needed) the single on-disk file holding all
    /// persisted state, with WAL journaling and a busy timeout so
    /// concurrent writers retry instead of erroring immediately.
    pub async fn open(database_url: &str) -> AppResult<Self> {
        let opts: SqliteConnectOptions = database_url
            .parse()
            .map_err(|e| AppError::StoreFatal(format!("invalid database url: {e}")))?;
        let opts = opts
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(opts)
            .await
            .map_err(|e| AppError::StoreFatal(format!("opening store: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Idempotent migrations: creates every table if absent, records the
    /// schema version, and assigns any pre-existing row with a null
    /// `user_id` to `local-default`.
    async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT UNIQUE,
                password_hash TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0,
                must_change_password INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                last_login_at INTEGER,
                preferences TEXT
            );

            CREATE TABLE IF NOT EXISTS session_tokens (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS failed_logins (
                username TEXT NOT NULL,
                attempted_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                source TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                tags TEXT,
                summary TEXT,
                created_at INTEGER NOT NULL,
                visibility TEXT NOT NULL DEFAULT 'private'
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_user ON chunks(user_id);
            CREATE INDEX IF NOT EXISTS idx_chunks_user_source ON chunks(user_id, source);

            CREATE TABLE IF NOT EXISTS chat_sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                provider_mode TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chat_messages_session ON chat_messages(session_id);

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                op_type TEXT NOT NULL,
                details TEXT NOT NULL,
                user_ctx TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS watched_folders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                path TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                last_scan_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS skills (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                triggers TEXT NOT NULL,
                requires_network INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::StoreFatal(format!("running migrations: {e}")))?;

        sqlx::query(
            "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?)",
        )
        .bind(SCHEMA_VERSION.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::StoreFatal(e.to_string()))?;

        self.ensure_local_default_user().await?;

        info!("store migrated to schema version {}", SCHEMA_VERSION);
        Ok(())
    }

    async fn ensure_local_default_user(&self) -> AppResult<()> {
        let exists: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE id = ?")
                .bind(LOCAL_DEFAULT_USER_ID)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::StoreFatal(e.to_string()))?;

        if exists.is_none() {
            let placeholder_hash = crate::auth::password::hash_password("")
                .unwrap_or_else(|_| "!".to_string());
            sqlx::query(
                r#"
                INSERT INTO users (id, username, email, password_hash, is_admin, must_change_password, created_at)
                VALUES (?, ?, NULL, ?, 1, 0, ?)
                "#,
            )
            .bind(LOCAL_DEFAULT_USER_ID)
            .bind(LOCAL_DEFAULT_USER_ID)
            .bind(placeholder_hash)
            .bind(models::now_ts())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::StoreFatal(e.to_string()))?;
        }
        Ok(())
    }
}

/// Retries a write closure a bounded number of times when the backing
/// engine reports SQLITE_BUSY, surfacing `StoreTransient` once the retry
/// budget is exhausted.
pub(crate) async fn with_busy_retry<T, F, Fut>(mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(sqlx::Error::Database(ref db_err))
                if db_err.code().as_deref() == Some("5") && attempt + 1 < BUSY_RETRY_ATTEMPTS =>
            {
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(20 * attempt as u64)).await;
                continue;
            }
            Err(e) => return Err(AppError::from_sqlx(e, attempt + 1 >= BUSY_RETRY_ATTEMPTS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{Role, Visibility};

    async fn open_memory() -> Store {
        Store::open("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn migrate_creates_local_default_user() {
        let store = open_memory().await;
        let user = store.get_user_by_id(LOCAL_DEFAULT_USER_ID).await.unwrap();
        assert!(user.is_some());
    }

    #[tokio::test]
    async fn user_round_trip_and_unique_username() {
        let store = open_memory().await;
        store
            .create_user("u1", "alice", "hashed", false)
            .await
            .unwrap();
        let fetched = store.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(fetched.id, "u1");

        let dup = store.create_user("u2", "alice", "hashed", false).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn session_token_resolves_and_expires() {
        let store = open_memory().await;
        store.create_user("u1", "alice", "hashed", false).await.unwrap();
        let token = store.create_session_token("u1", 30).await.unwrap();
        assert_eq!(store.resolve_session_token(&token).await.unwrap(), "u1");

        let expired = store.create_session_token("u1", -1).await.unwrap();
        assert!(matches!(
            store.resolve_session_token(&expired).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn chunk_visibility_never_crosses_users() {
        let store = open_memory().await;
        store.create_user("u1", "alice", "h", false).await.unwrap();
        store.create_user("u2", "bob", "h", false).await.unwrap();

        store
            .insert_chunk("u1", "notes.md", "private text", &[1.0, 0.0], &[], None, Visibility::Private)
            .await
            .unwrap();
        store
            .insert_chunk("u1", "shared.md", "shared text", &[0.0, 1.0], &[], None, Visibility::Shared)
            .await
            .unwrap();

        let visible_to_bob = store.chunks_visible_to("u2").await.unwrap();
        assert!(visible_to_bob.is_empty(), "bob must never see alice's chunks, shared or not");

        let visible_to_alice = store.chunks_visible_to("u1").await.unwrap();
        assert_eq!(visible_to_alice.len(), 1, "alice's own search corpus excludes her non-private chunk");
        assert_eq!(visible_to_alice[0].source, "notes.md");
    }

    #[tokio::test]
    async fn chat_session_ownership_enforced() {
        let store = open_memory().await;
        store.create_user("u1", "alice", "h", false).await.unwrap();
        store.create_user("u2", "bob", "h", false).await.unwrap();
        let session = store.create_chat_session("u1").await.unwrap();

        assert!(store.require_session_owner(&session.id, "u1").await.is_ok());
        assert!(matches!(
            store.require_session_owner(&session.id, "u2").await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            store.require_session_owner("missing", "u1").await,
            Err(AppError::NotFound(_))
        ));

        store
            .append_chat_message(&session.id, Role::User, "hello", "local")
            .await
            .unwrap();
        let history = store.chat_history(&session.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn user_session_history_is_owner_scoped() {
        let store = open_memory().await;
        store.create_user("u1", "alice", "h", false).await.unwrap();
        store.create_user("u2", "bob", "h", false).await.unwrap();
        let session = store.create_chat_session("u1").await.unwrap();
        store
            .append_chat_message(&session.id, Role::User, "hello", "local")
            .await
            .unwrap();

        let owned = store.user_session_history(&session.id, "u1").await.unwrap();
        assert_eq!(owned.len(), 1);

        assert!(matches!(
            store.user_session_history(&session.id, "u2").await,
            Err(AppError::Forbidden)
        ));

        let sessions = store.get_user_sessions("u1").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, session.id);
        assert!(store.get_user_sessions("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watched_folders_scoped_per_user() {
        let store = open_memory().await;
        store.create_user("u1", "alice", "h", false).await.unwrap();
        store.create_user("u2", "bob", "h", false).await.unwrap();
        store.add_watched_folder("u1", "/docs/alice").await.unwrap();
        store.add_watched_folder("u2", "/docs/bob").await.unwrap();

        let alice_folders = store.get_watched_folders_by_user("u1").await.unwrap();
        assert_eq!(alice_folders.len(), 1);
        assert_eq!(alice_folders[0].path, "/docs/alice");

        assert_eq!(store.list_watched_folders().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_user_requires_admin_and_rejects_self_delete() {
        let store = open_memory().await;
        store.create_user("admin", "root", "h", true).await.unwrap();
        store.create_user("u1", "alice", "h", false).await.unwrap();
        store.create_user("u2", "bob", "h", false).await.unwrap();

        assert!(matches!(
            store.delete_user("u2", "u1").await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            store.delete_user("admin", "admin").await,
            Err(AppError::InvalidInput(_))
        ));

        store.delete_user("admin", "u1").await.unwrap();
        assert!(store.get_user_by_id("u1").await.unwrap().is_none());

        assert!(matches!(
            store.delete_user("admin", "u1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_login_window_counts_recent_only() {
        let store = open_memory().await;
        store.record_failed_login("alice").await.unwrap();
        store.record_failed_login("alice").await.unwrap();
        let count = store.recent_failed_login_count("alice", 15).await.unwrap();
        assert_eq!(count, 2);

        store.clear_failed_logins("alice").await.unwrap();
        let count = store.recent_failed_login_count("alice", 15).await.unwrap();
        assert_eq!(count, 0);
    }
}
