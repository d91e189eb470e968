use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;
use utoipa::OpenApi;

use crate::entities::{NewPost, NewPostComment, PostStore};
use crate::error::ServerError;
use crate::schemas::api::posts::{
    CommentResponse, CreateCommentRequest, CreatePostRequest, LikeResponse, PostListQuery,
    PostResponse,
};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;
const ANONYMOUS: &str = "Anonymous";

#[derive(OpenApi)]
#[openapi(
    paths(list_posts, create_post, get_post, delete_post, like_post, list_comments, add_comment),
    components(schemas(
        CreatePostRequest,
        PostResponse,
        LikeResponse,
        CreateCommentRequest,
        CommentResponse
    ))
)]
pub struct PostsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post).delete(delete_post))
        .route("/posts/{id}/like", post(like_post))
        .route("/posts/{id}/comments", get(list_comments).post(add_comment))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn post_not_found(id: i64) -> ServerError {
    ServerError::NotFound(format!("post {id} not found"))
}

#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "community",
    params(PostListQuery),
    responses((status = 200, description = "Approved posts, newest first", body = Vec<PostResponse>))
)]
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Vec<PostResponse>>, ServerError> {
    let category = non_blank(query.category);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let posts = state.store.list_posts(category.as_deref(), limit).await?;
    Ok(Json(posts.iter().map(|p| p.to_response()).collect()))
}

#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "community",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Empty content"),
    )
)]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PostResponse>), ServerError> {
    let Json(req) = payload?;
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ServerError::BadRequest("Content cannot be empty".into()));
    }
    let post = state
        .store
        .create_post(NewPost {
            author_name: non_blank(req.author_name).unwrap_or_else(|| ANONYMOUS.to_owned()),
            author_email: non_blank(req.author_email),
            content: content.to_owned(),
            category: non_blank(req.category),
        })
        .await?;
    info!(post_id = post.id, "community post created");
    Ok((StatusCode::CREATED, Json(post.to_response())))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "community",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post, with the view counted", body = PostResponse),
        (status = 404, description = "No such post"),
    )
)]
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ServerError> {
    let post = state.store.view_post(id).await?.ok_or_else(|| post_not_found(id))?;
    Ok(Json(post.to_response()))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "community",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post and its comments deleted", body = Value),
        (status = 404, description = "No such post"),
    )
)]
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ServerError> {
    if !state.store.delete_post(id).await? {
        return Err(post_not_found(id));
    }
    info!(post_id = id, "community post deleted");
    Ok(Json(json!({ "deleted": true })))
}

#[utoipa::path(
    post,
    path = "/api/posts/{id}/like",
    tag = "community",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "New like count", body = LikeResponse),
        (status = 404, description = "No such post"),
    )
)]
pub async fn like_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<LikeResponse>, ServerError> {
    let likes = state.store.like_post(id).await?.ok_or_else(|| post_not_found(id))?;
    Ok(Json(LikeResponse { likes }))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}/comments",
    tag = "community",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comments, oldest first", body = Vec<CommentResponse>),
        (status = 404, description = "No such post"),
    )
)]
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CommentResponse>>, ServerError> {
    if state.store.get_post(id).await?.is_none() {
        return Err(post_not_found(id));
    }
    let comments = state.store.list_comments(id).await?;
    Ok(Json(comments.iter().map(|c| c.to_response()).collect()))
}

#[utoipa::path(
    post,
    path = "/api/posts/{id}/comments",
    tag = "community",
    params(("id" = i64, Path, description = "Post id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Empty content"),
        (status = 404, description = "No such post"),
    )
)]
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentResponse>), ServerError> {
    let Json(req) = payload?;
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ServerError::BadRequest("Content cannot be empty".into()));
    }
    let comment = state
        .store
        .add_comment(
            id,
            NewPostComment {
                author_name: non_blank(req.author_name).unwrap_or_else(|| ANONYMOUS.to_owned()),
                content: content.to_owned(),
            },
        )
        .await?
        .ok_or_else(|| post_not_found(id))?;
    Ok((StatusCode::CREATED, Json(comment.to_response())))
}
