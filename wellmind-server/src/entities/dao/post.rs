use chrono::{DateTime, Utc};

/// A row in the `community_posts` table.
#[derive(Debug, Clone)]
pub struct CommunityPost {
    pub id: i64,
    pub author_name: String,
    pub author_email: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub likes: i64,
    pub comments_count: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_approved: bool,
    pub is_featured: bool,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_name: String,
    pub author_email: Option<String>,
    pub content: String,
    pub category: Option<String>,
}

/// A row in the `post_comments` table.
#[derive(Debug, Clone)]
pub struct PostComment {
    pub id: i64,
    pub post_id: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPostComment {
    pub author_name: String,
    pub content: String,
}
