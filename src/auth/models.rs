// src/auth/models.rs
// Request/response shapes for the identity and sessions surface. The
// stored `User`/`PublicUser` row types live in `store::models`; this module
// only adds the wire-facing request/response wrappers.

use serde::{Deserialize, Serialize};

use crate::store::models::PublicUser;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
    /// Client-side nag flag directing the caller to a change-password
    /// flow; enforcement stays a client concern.
    pub must_change_password: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub preferences: serde_json::Value,
}
