// src/store/watched_folders.rs
// Persisted watch registry, separate from the in-memory watch registry
// the watcher service keeps for active `notify` handles.

use super::models::{now_ts, WatchedFolder};
use super::{with_busy_retry, Store};
use crate::error::{AppError, AppResult};

impl Store {
    pub async fn add_watched_folder(&self, user_id: &str, path: &str) -> AppResult<WatchedFolder> {
        let id = with_busy_retry(|| {
            sqlx::query(
                "INSERT INTO watched_folders (user_id, path, active) VALUES (?, ?, 1)",
            )
            .bind(user_id)
            .bind(path)
            .execute(&self.pool)
        })
        .await?
        .last_insert_rowid();

        Ok(WatchedFolder {
            id,
            user_id: user_id.to_string(),
            path: path.to_string(),
            active: true,
            last_scan_at: None,
        })
    }

    pub async fn list_watched_folders(&self) -> AppResult<Vec<WatchedFolder>> {
        sqlx::query_as::<_, WatchedFolder>("SELECT * FROM watched_folders WHERE active = 1")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx(e, true))
    }

    /// Active watched folders owned by `user_id`, for a per-user settings view.
    pub async fn get_watched_folders_by_user(&self, user_id: &str) -> AppResult<Vec<WatchedFolder>> {
        sqlx::query_as::<_, WatchedFolder>(
            "SELECT * FROM watched_folders WHERE user_id = ? AND active = 1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx(e, true))
    }

    pub async fn deactivate_watched_folder(&self, id: i64) -> AppResult<()> {
        with_busy_retry(|| {
            sqlx::query("UPDATE watched_folders SET active = 0 WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    pub async fn touch_watched_folder(&self, id: i64) -> AppResult<()> {
        with_busy_retry(|| {
            sqlx::query("UPDATE watched_folders SET last_scan_at = ? WHERE id = ?")
                .bind(now_ts())
                .bind(id)
                .execute(&self.pool)
        })
        .await?;
        Ok(())
    }
}
