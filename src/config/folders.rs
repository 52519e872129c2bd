// src/config/folders.rs

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderConfig {
    pub path: String,
    pub user_id: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl FolderConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.path.trim().is_empty() {
            return Err(AppError::InvalidInput("folders[].path is empty".into()));
        }
        if self.user_id.trim().is_empty() {
            return Err(AppError::InvalidInput("folders[].user_id is empty".into()));
        }
        Ok(())
    }
}
