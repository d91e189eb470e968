use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Author of a chat turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single row in the `chat_messages` table.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub is_mental_health_related: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub session_id: String,
    pub role: Role,
    pub content: String,
}
