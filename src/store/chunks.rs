// src/store/chunks.rs
// Chunk persistence and retrieval.
//
// Embeddings are stored as BLOBs of little-endian f32 directly in the
// `chunks` row rather than in a separate vector store — see DESIGN.md for
// why this favors in-process cosine similarity, keeping the whole store in
// a single SQLite file.

use sqlx::Row;

use super::models::{now_ts, ChunkRow, LibraryEntry, Visibility};
use super::{with_busy_retry, Store};
use crate::error::AppError;
use crate::error::AppResult;

pub fn embedding_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

impl Store {
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_chunk(
        &self,
        user_id: &str,
        source: &str,
        text: &str,
        embedding: &[f32],
        tags: &[String],
        summary: Option<&str>,
        visibility: Visibility,
    ) -> AppResult<i64> {
        let tags_json = serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string());
        let blob = embedding_to_bytes(embedding);
        let created_at = now_ts();

        let id = with_busy_retry(|| {
            sqlx::query(
                r#"
                INSERT INTO chunks (user_id, source, text, embedding, tags, summary, created_at, visibility)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(source)
            .bind(text)
            .bind(&blob)
            .bind(&tags_json)
            .bind(summary)
            .bind(created_at)
            .bind(visibility.as_str())
            .execute(&self.pool)
        })
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    /// Chunks owned by `user_id`. Never returns another user's rows,
    /// regardless of visibility — shared/public chunks are a library-listing
    /// concept, not a search-corpus one.
    pub async fn chunks_visible_to(&self, user_id: &str) -> AppResult<Vec<ChunkRow>> {
        sqlx::query_as::<_, ChunkRow>(
            r#"
            SELECT * FROM chunks
            WHERE user_id = ? AND visibility = 'private'
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx(e, true))
    }

    pub async fn delete_source(&self, user_id: &str, source: &str) -> AppResult<u64> {
        let result = with_busy_retry(|| {
            sqlx::query("DELETE FROM chunks WHERE user_id = ? AND source = ?")
                .bind(user_id)
                .bind(source)
                .execute(&self.pool)
        })
        .await?;
        Ok(result.rows_affected())
    }

    /// One row per distinct source owned by `user_id`, for the library
    /// listing surface.
    pub async fn library_for_user(&self, user_id: &str) -> AppResult<Vec<LibraryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT source, COUNT(*) as chunk_count, MAX(summary) as summary,
                   MAX(tags) as tags, MAX(created_at) as most_recent_created_at
            FROM chunks
            WHERE user_id = ? AND visibility = 'private'
            GROUP BY source
            ORDER BY most_recent_created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx(e, true))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags_json: Option<String> = row.get("tags");
                let tags = tags_json
                    .and_then(|j| serde_json::from_str::<Vec<String>>(&j).ok())
                    .unwrap_or_default();
                LibraryEntry {
                    source: row.get("source"),
                    chunk_count: row.get("chunk_count"),
                    summary: row.get("summary"),
                    tags,
                    most_recent_created_at: row.get("most_recent_created_at"),
                }
            })
            .collect())
    }
}
