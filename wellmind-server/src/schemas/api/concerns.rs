use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entities::{Concern, ConcernStatus};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateConcernRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RespondRequest {
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConcernListQuery {
    pub category: Option<String>,
    /// `open`, `responded` or `closed`.
    pub status: Option<String>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConcernResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub response: Option<String>,
    pub status: ConcernStatus,
    pub upvotes: i64,
    pub is_anonymous: bool,
    pub created_at: String,
    pub responded_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpvoteResponse {
    pub upvotes: i64,
}

impl Concern {
    pub fn to_response(&self) -> ConcernResponse {
        ConcernResponse {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            response: self.response.clone(),
            status: self.status,
            upvotes: self.upvotes,
            is_anonymous: self.is_anonymous,
            created_at: self.created_at.to_rfc3339(),
            responded_at: self.responded_at.map(|t| t.to_rfc3339()),
        }
    }
}
