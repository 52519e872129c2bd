// src/auth/password.rs
// Bcrypt hashing with a cost factor comfortably above the minimum floor,
// returning `AppResult` instead of `anyhow::Result` to keep errors closed.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, AppResult};

const COST: u32 = DEFAULT_COST; // 12, comfortably above the ≥10 floor.

pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, COST).map_err(|e| AppError::StoreFatal(format!("hashing password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    verify(password, hash).map_err(|e| AppError::StoreFatal(format!("verifying password: {e}")))
}
