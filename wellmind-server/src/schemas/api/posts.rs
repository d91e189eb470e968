use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entities::{CommunityPost, PostComment};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: String,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostListQuery {
    /// Only posts in this category.
    pub category: Option<String>,
    /// Maximum number of posts (default 50, at most 200).
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    pub id: i64,
    pub author_name: String,
    pub author_email: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub likes: i64,
    pub comments_count: i64,
    pub views: i64,
    pub created_at: String,
    pub updated_at: String,
    pub is_featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LikeResponse {
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: String,
}

impl CommunityPost {
    pub fn to_response(&self) -> PostResponse {
        PostResponse {
            id: self.id,
            author_name: self.author_name.clone(),
            author_email: self.author_email.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            likes: self.likes,
            comments_count: self.comments_count,
            views: self.views,
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
            is_featured: self.is_featured,
        }
    }
}

impl PostComment {
    pub fn to_response(&self) -> CommentResponse {
        CommentResponse {
            id: self.id,
            post_id: self.post_id,
            author_name: self.author_name.clone(),
            content: self.content.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
