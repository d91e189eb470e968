use std::future::Future;

use crate::entities::{
    dao::{ChatMessage, NewChatMessage, Role},
    now_timestamp, parse_timestamp, SqliteStore,
};

type MessageRow = (i64, String, String, String, bool, String);

const SELECT_COLUMNS: &str =
    "SELECT id, session_id, role, content, is_mental_health_related, created_at FROM chat_messages";

pub trait ChatStore: Send + Sync + 'static {
    /// Append one turn; returns the stored row with its assigned id and timestamp.
    fn append_message(
        &self,
        msg: NewChatMessage,
    ) -> impl Future<Output = Result<ChatMessage, sqlx::Error>> + Send;

    /// Oldest-first history of a session, capped at `limit` rows.
    fn list_messages(
        &self,
        session_id: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, sqlx::Error>> + Send;

    /// The newest `limit` turns of a session, newest first.
    fn recent_messages(
        &self,
        session_id: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, sqlx::Error>> + Send;
}

impl ChatStore for SqliteStore {
    async fn append_message(&self, msg: NewChatMessage) -> Result<ChatMessage, sqlx::Error> {
        let created_at = now_timestamp();
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO chat_messages (session_id, role, content, is_mental_health_related, created_at) \
             VALUES (?1, ?2, ?3, 1, ?4) RETURNING id",
        )
        .bind(&msg.session_id)
        .bind(msg.role.as_ref())
        .bind(&msg.content)
        .bind(&created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(ChatMessage {
            id,
            session_id: msg.session_id,
            role: msg.role,
            content: msg.content,
            is_mental_health_related: true,
            created_at: parse_timestamp(&created_at, "chat_messages.created_at"),
        })
    }

    async fn list_messages(&self, session_id: &str, limit: i64) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE session_id = ?1 ORDER BY created_at ASC, id ASC LIMIT ?2"
        ))
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().filter_map(into_message).collect())
    }

    async fn recent_messages(&self, session_id: &str, limit: i64) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE session_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().filter_map(into_message).collect())
    }
}

fn into_message(
    (id, session_id, role, content, is_mental_health_related, created_at): MessageRow,
) -> Option<ChatMessage> {
    let role = match role.parse::<Role>() {
        Ok(r) => r,
        Err(_) => {
            tracing::warn!(id, raw = %role, "skipping chat message with unknown role");
            return None;
        }
    };
    Some(ChatMessage {
        id,
        session_id,
        role,
        content,
        is_mental_health_related,
        created_at: parse_timestamp(&created_at, "chat_messages.created_at"),
    })
}
