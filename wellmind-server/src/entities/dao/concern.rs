use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Categories a concern may be filed under.
pub const CONCERN_CATEGORIES: [&str; 7] = [
    "General Health",
    "Mental Health",
    "Maternal Health",
    "Pediatrics",
    "Nutrition",
    "Sexual Health",
    "Chronic Diseases",
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConcernStatus {
    Open,
    Responded,
    Closed,
}

/// A row in the `concerns` table.
#[derive(Debug, Clone)]
pub struct Concern {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub author_id: Option<i64>,
    pub response: Option<String>,
    pub status: ConcernStatus,
    pub upvotes: i64,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewConcern {
    pub title: String,
    pub content: String,
    pub category: String,
    pub is_anonymous: bool,
}

/// Optional filters for listing concerns.
#[derive(Debug, Clone, Default)]
pub struct ConcernFilter {
    pub category: Option<String>,
    pub status: Option<ConcernStatus>,
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
}
