use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{ChatMessage, Role};
use crate::services::{ReplySource, TurnOutcome};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The user's message; must not be blank.
    #[serde(default)]
    pub message: String,
    /// Continue an existing conversation; a new id is issued when absent.
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    /// RFC 3339 timestamp of the reply.
    pub timestamp: String,
    pub source: ReplySource,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub is_mental_health_related: bool,
}

impl TurnOutcome {
    pub fn to_response(&self) -> ChatResponse {
        ChatResponse {
            response: self.reply.clone(),
            session_id: self.session_id.clone(),
            timestamp: self.timestamp.to_rfc3339(),
            source: self.source,
        }
    }
}

impl ChatMessage {
    pub fn to_response(&self) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            role: self.role,
            content: self.content.clone(),
            timestamp: self.created_at.to_rfc3339(),
            is_mental_health_related: self.is_mental_health_related,
        }
    }
}
