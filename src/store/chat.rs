// src/store/chat.rs
// Chat session/turn persistence.

use uuid::Uuid;

use super::models::{now_ts, ChatMessage, ChatSession, Role};
use super::{with_busy_retry, Store};
use crate::error::{AppError, AppResult};

impl Store {
    pub async fn create_chat_session(&self, user_id: &str) -> AppResult<ChatSession> {
        let id = Uuid::new_v4().to_string();
        let ts = now_ts();
        with_busy_retry(|| {
            sqlx::query(
                "INSERT INTO chat_sessions (id, user_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(user_id)
            .bind(ts)
            .bind(ts)
            .execute(&self.pool)
        })
        .await?;

        Ok(ChatSession {
            id,
            user_id: user_id.to_string(),
            created_at: ts,
            updated_at: ts,
        })
    }

    pub async fn get_chat_session(&self, session_id: &str) -> AppResult<Option<ChatSession>> {
        sqlx::query_as::<_, ChatSession>("SELECT * FROM chat_sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx(e, true))
    }

    /// Confirms `user_id` owns `session_id`, returning `Forbidden` when it
    /// exists but belongs to someone else, and `NotFound` when it doesn't
    /// exist at all — the caller needs to tell the two apart.
    pub async fn require_session_owner(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> AppResult<ChatSession> {
        match self.get_chat_session(session_id).await? {
            None => Err(AppError::NotFound(format!("chat session {session_id}"))),
            Some(session) if session.user_id != user_id => Err(AppError::Forbidden),
            Some(session) => Ok(session),
        }
    }

    pub async fn append_chat_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        provider_mode: &str,
    ) -> AppResult<ChatMessage> {
        let ts = now_ts();
        let id = with_busy_retry(|| {
            sqlx::query(
                r#"
                INSERT INTO chat_messages (session_id, role, content, provider_mode, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(session_id)
            .bind(role.as_str())
            .bind(content)
            .bind(provider_mode)
            .bind(ts)
            .execute(&self.pool)
        })
        .await?
        .last_insert_rowid();

        with_busy_retry(|| {
            sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE id = ?")
                .bind(ts)
                .bind(session_id)
                .execute(&self.pool)
        })
        .await
        .ok();

        Ok(ChatMessage {
            id,
            session_id: session_id.to_string(),
            role: role.as_str().to_string(),
            content: content.to_string(),
            provider_mode: provider_mode.to_string(),
            created_at: ts,
        })
    }

    pub async fn chat_history(&self, session_id: &str) -> AppResult<Vec<ChatMessage>> {
        sqlx::query_as::<_, ChatMessage>(
            "SELECT * FROM chat_messages WHERE session_id = ? ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx(e, true))
    }

    /// `chat_history`, but scoped to `user_id`: a wrong owner gets the same
    /// `Forbidden`/`NotFound` split as `require_session_owner`, rather than
    /// silently handing back another user's messages.
    pub async fn user_session_history(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<ChatMessage>> {
        self.require_session_owner(session_id, user_id).await?;
        self.chat_history(session_id).await
    }

    /// All chat sessions belonging to `user_id`, most recently updated first.
    pub async fn get_user_sessions(&self, user_id: &str) -> AppResult<Vec<ChatSession>> {
        sqlx::query_as::<_, ChatSession>(
            "SELECT * FROM chat_sessions WHERE user_id = ? ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx(e, true))
    }
}
