use std::future::Future;

use crate::entities::{
    dao::{CommunityPost, NewPost, NewPostComment, PostComment},
    now_timestamp, parse_timestamp, SqliteStore,
};

type PostRow = (
    i64,
    String,
    Option<String>,
    String,
    Option<String>,
    i64,
    i64,
    i64,
    String,
    String,
    bool,
    bool,
);

type CommentRow = (i64, i64, String, String, String);

const POST_COLUMNS: &str = "SELECT id, author_name, author_email, content, category, likes, \
     comments_count, views, created_at, updated_at, is_approved, is_featured FROM community_posts";

const COMMENT_COLUMNS: &str =
    "SELECT id, post_id, author_name, content, created_at FROM post_comments";

pub trait PostStore: Send + Sync + 'static {
    fn create_post(&self, post: NewPost) -> impl Future<Output = Result<CommunityPost, sqlx::Error>> + Send;
    /// Approved posts, newest first, optionally filtered by category.
    fn list_posts(
        &self,
        category: Option<&str>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<CommunityPost>, sqlx::Error>> + Send;
    fn get_post(&self, id: i64) -> impl Future<Output = Result<Option<CommunityPost>, sqlx::Error>> + Send;
    /// Fetch a post and count the view.
    fn view_post(&self, id: i64) -> impl Future<Output = Result<Option<CommunityPost>, sqlx::Error>> + Send;
    /// Returns the new like count, or `None` if the post does not exist.
    fn like_post(&self, id: i64) -> impl Future<Output = Result<Option<i64>, sqlx::Error>> + Send;
    /// Returns `true` if a post was deleted. Comments go with it.
    fn delete_post(&self, id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    /// Returns `None` if the post does not exist.
    fn add_comment(
        &self,
        post_id: i64,
        comment: NewPostComment,
    ) -> impl Future<Output = Result<Option<PostComment>, sqlx::Error>> + Send;
    fn list_comments(&self, post_id: i64) -> impl Future<Output = Result<Vec<PostComment>, sqlx::Error>> + Send;
}

impl PostStore for SqliteStore {
    async fn create_post(&self, post: NewPost) -> Result<CommunityPost, sqlx::Error> {
        let now = now_timestamp();
        let row: PostRow = sqlx::query_as(
            "INSERT INTO community_posts (author_name, author_email, content, category, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
             RETURNING id, author_name, author_email, content, category, likes, \
             comments_count, views, created_at, updated_at, is_approved, is_featured",
        )
        .bind(&post.author_name)
        .bind(&post.author_email)
        .bind(&post.content)
        .bind(&post.category)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(into_post(row))
    }

    async fn list_posts(&self, category: Option<&str>, limit: i64) -> Result<Vec<CommunityPost>, sqlx::Error> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "{POST_COLUMNS} WHERE is_approved = 1 AND (?1 IS NULL OR category = ?1) \
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))
        .bind(category)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_post).collect())
    }

    async fn get_post(&self, id: i64) -> Result<Option<CommunityPost>, sqlx::Error> {
        let row: Option<PostRow> = sqlx::query_as(&format!("{POST_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(into_post))
    }

    async fn view_post(&self, id: i64) -> Result<Option<CommunityPost>, sqlx::Error> {
        sqlx::query("UPDATE community_posts SET views = views + 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.get_post(id).await
    }

    async fn like_post(&self, id: i64) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE community_posts SET likes = likes + 1, updated_at = ?2 WHERE id = ?1 RETURNING likes",
        )
        .bind(id)
        .bind(now_timestamp())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(likes,)| likes))
    }

    async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM community_posts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_comment(
        &self,
        post_id: i64,
        comment: NewPostComment,
    ) -> Result<Option<PostComment>, sqlx::Error> {
        let now = now_timestamp();
        let mut tx = self.pool.begin().await?;

        let bumped = sqlx::query(
            "UPDATE community_posts SET comments_count = comments_count + 1, updated_at = ?2 WHERE id = ?1",
        )
        .bind(post_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        if bumped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row: CommentRow = sqlx::query_as(
            "INSERT INTO post_comments (post_id, author_name, content, created_at) \
             VALUES (?1, ?2, ?3, ?4) RETURNING id, post_id, author_name, content, created_at",
        )
        .bind(post_id)
        .bind(&comment.author_name)
        .bind(&comment.content)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(into_comment(row)))
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<PostComment>, sqlx::Error> {
        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "{COMMENT_COLUMNS} WHERE post_id = ?1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_comment).collect())
    }
}

fn into_post(
    (
        id,
        author_name,
        author_email,
        content,
        category,
        likes,
        comments_count,
        views,
        created_at,
        updated_at,
        is_approved,
        is_featured,
    ): PostRow,
) -> CommunityPost {
    CommunityPost {
        id,
        author_name,
        author_email,
        content,
        category,
        likes,
        comments_count,
        views,
        created_at: parse_timestamp(&created_at, "community_posts.created_at"),
        updated_at: parse_timestamp(&updated_at, "community_posts.updated_at"),
        is_approved,
        is_featured,
    }
}

fn into_comment((id, post_id, author_name, content, created_at): CommentRow) -> PostComment {
    PostComment {
        id,
        post_id,
        author_name,
        content,
        created_at: parse_timestamp(&created_at, "post_comments.created_at"),
    }
}
