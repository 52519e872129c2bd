// src/auth/middleware.rs
// Request-context user resolution. The HTTP framework that would actually
// call this per-request is out of scope (no server binary ships in this
// core), but the resolution rule itself is core logic and is tested
// directly here.

use crate::config::UserMode;
use crate::error::{AppError, AppResult};
use crate::store::models::LOCAL_DEFAULT_USER_ID;
use crate::store::Store;

pub const PUBLIC_PATHS: &[&str] = &["/login", "/register", "/static", "/api/login", "/api/register"];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|p| path == *p || path.starts_with(&format!("{p}/")))
}

/// Resolves the acting `user_id` for a request. Single-tenant mode always
/// resolves to the local-default user; multi-tenant mode requires a bearer
/// token (header wins over cookie when both are present).
pub async fn resolve_user_id(
    store: &Store,
    user_mode: UserMode,
    bearer_token: Option<&str>,
    cookie_token: Option<&str>,
) -> AppResult<String> {
    if user_mode == UserMode::Single {
        return Ok(LOCAL_DEFAULT_USER_ID.to_string());
    }

    let token = bearer_token.or(cookie_token).ok_or(AppError::Unauthorized)?;
    store.resolve_session_token(token).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_match_prefix() {
        assert!(is_public_path("/login"));
        assert!(is_public_path("/static/app.js"));
        assert!(!is_public_path("/ask"));
    }

    #[tokio::test]
    async fn single_tenant_always_resolves_local_default() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        let user_id = resolve_user_id(&store, UserMode::Single, None, None).await.unwrap();
        assert_eq!(user_id, LOCAL_DEFAULT_USER_ID);
    }

    #[tokio::test]
    async fn multi_tenant_requires_token() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        let result = resolve_user_id(&store, UserMode::Multi, None, None).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn multi_tenant_header_wins_over_cookie() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        store.create_user("u1", "alice", "h", false).await.unwrap();
        let header_token = store.create_session_token("u1", 30).await.unwrap();

        store.create_user("u2", "bob", "h", false).await.unwrap();
        let cookie_token = store.create_session_token("u2", 30).await.unwrap();

        let user_id = resolve_user_id(
            &store,
            UserMode::Multi,
            Some(&header_token),
            Some(&cookie_token),
        )
        .await
        .unwrap();
        assert_eq!(user_id, "u1");
    }
}
