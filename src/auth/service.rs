// src/auth/service.rs
// AuthService: login, registration, password change, and preference
// updates, layered over `Store` rather than holding its own `SqlitePool` —
// the store already owns lockout and token persistence, so the service
// only orchestrates.

use std::time::{Duration, SystemTime};

use uuid::Uuid;

use super::models::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest};
use super::password::{hash_password, verify_password};
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::store::models::PublicUser;
use crate::store::Store;

pub struct AuthService<'a> {
    store: &'a Store,
    config: &'a AuthConfig,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a Store, config: &'a AuthConfig) -> Self {
        Self { store, config }
    }

    /// Lockout check, credential verification, token mint, bookkeeping, in
    /// that order.
    pub async fn login(&self, req: LoginRequest) -> AppResult<AuthResponse> {
        if let Some(until) = self.lockout_until(&req.username).await? {
            return Err(AppError::Locked { until });
        }

        let user = match self.store.get_user_by_username(&req.username).await? {
            Some(u) => u,
            None => {
                self.store.record_failed_login(&req.username).await?;
                return Err(AppError::Unauthorized);
            }
        };

        if !verify_password(&req.password, &user.password_hash)? {
            self.store.record_failed_login(&req.username).await?;
            return Err(AppError::Unauthorized);
        }

        let token = self
            .store
            .create_session_token(&user.id, self.config.session_expiry_days)
            .await?;
        self.store.record_login(&user.id).await?;
        self.store.clear_failed_logins(&req.username).await?;

        Ok(AuthResponse {
            must_change_password: user.must_change_password,
            user: PublicUser::from(user),
            token,
        })
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<AuthResponse> {
        if req.username.trim().is_empty() {
            return Err(AppError::InvalidInput("username is empty".into()));
        }
        if req.password.len() < 8 {
            return Err(AppError::InvalidInput(
                "password must be at least 8 characters".into(),
            ));
        }
        if self.store.username_taken(&req.username).await? {
            return Err(AppError::Conflict(format!(
                "username {} already exists",
                req.username
            )));
        }

        let password_hash = hash_password(&req.password)?;
        let id = Uuid::new_v4().to_string();
        let user = self
            .store
            .create_user(&id, &req.username, &password_hash, false)
            .await?;

        let token = self
            .store
            .create_session_token(&user.id, self.config.session_expiry_days)
            .await?;

        Ok(AuthResponse {
            must_change_password: user.must_change_password,
            user: PublicUser::from(user),
            token,
        })
    }

    pub async fn resolve_token(&self, token: &str) -> AppResult<String> {
        self.store.resolve_session_token(token).await
    }

    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.store.revoke_session_token(token).await
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        req: ChangePasswordRequest,
    ) -> AppResult<()> {
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        if !verify_password(&req.current_password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }
        if req.new_password.len() < 8 {
            return Err(AppError::InvalidInput(
                "new password must be at least 8 characters".into(),
            ));
        }

        let new_hash = hash_password(&req.new_password)?;
        self.store.set_password_hash(user_id, &new_hash, false).await
    }

    pub async fn update_preferences(&self, user_id: &str, preferences_json: &str) -> AppResult<()> {
        self.store.set_preferences(user_id, preferences_json).await
    }

    /// Threshold failures within the trailing window locks the account
    /// until `last_failure + duration`.
    async fn lockout_until(&self, username: &str) -> AppResult<Option<SystemTime>> {
        let count = self
            .store
            .recent_failed_login_count(username, self.config.lockout_duration_minutes)
            .await?;
        if count < self.config.lockout_threshold as i64 {
            return Ok(None);
        }
        let last = self.store.last_failed_login_at(username).await?;
        Ok(last.map(|ts| {
            let base = SystemTime::UNIX_EPOCH + Duration::from_secs(ts as u64);
            base + Duration::from_secs(self.config.lockout_duration_minutes as u64 * 60)
        }))
    }
}
