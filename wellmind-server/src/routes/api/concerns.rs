use std::str::FromStr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::entities::{ConcernFilter, ConcernStatus, ConcernStore, NewConcern, CONCERN_CATEGORIES};
use crate::error::ServerError;
use crate::schemas::api::concerns::{
    ConcernListQuery, ConcernResponse, CreateConcernRequest, RespondRequest, UpvoteResponse,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_concerns, create_concern, get_concern, respond_to_concern, upvote_concern, list_categories),
    components(schemas(
        CreateConcernRequest,
        RespondRequest,
        ConcernResponse,
        UpvoteResponse,
        ConcernStatus
    ))
)]
pub struct ConcernsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/concerns", get(list_concerns).post(create_concern))
        .route("/concerns/{id}", get(get_concern))
        .route("/concerns/{id}/respond", patch(respond_to_concern))
        .route("/concerns/{id}/upvote", post(upvote_concern))
        .route("/categories", get(list_categories))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn concern_not_found(id: i64) -> ServerError {
    ServerError::NotFound(format!("concern {id} not found"))
}

#[utoipa::path(
    get,
    path = "/api/concerns",
    tag = "concerns",
    params(ConcernListQuery),
    responses(
        (status = 200, description = "Concerns, newest first", body = Vec<ConcernResponse>),
        (status = 400, description = "Unknown status"),
    )
)]
pub async fn list_concerns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConcernListQuery>,
) -> Result<Json<Vec<ConcernResponse>>, ServerError> {
    let status = non_blank(query.status)
        .map(|s| {
            ConcernStatus::from_str(&s.to_lowercase())
                .map_err(|_| ServerError::BadRequest(format!("unknown status '{s}'")))
        })
        .transpose()?;
    let filter = ConcernFilter {
        category: non_blank(query.category),
        status,
        search: non_blank(query.search),
    };
    let concerns = state.store.list_concerns(filter).await?;
    Ok(Json(concerns.iter().map(|c| c.to_response()).collect()))
}

#[utoipa::path(
    post,
    path = "/api/concerns",
    tag = "concerns",
    request_body = CreateConcernRequest,
    responses(
        (status = 201, description = "Concern filed", body = ConcernResponse),
        (status = 400, description = "Missing field or unknown category"),
    )
)]
pub async fn create_concern(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateConcernRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ConcernResponse>), ServerError> {
    let Json(req) = payload?;
    let title = req.title.trim();
    let content = req.content.trim();
    if title.is_empty() || content.is_empty() {
        return Err(ServerError::BadRequest("Title and content are required".into()));
    }
    if !CONCERN_CATEGORIES.contains(&req.category.as_str()) {
        return Err(ServerError::BadRequest(format!("unknown category '{}'", req.category)));
    }

    let concern = state
        .store
        .create_concern(NewConcern {
            title: title.to_owned(),
            content: content.to_owned(),
            category: req.category,
            is_anonymous: req.is_anonymous,
        })
        .await?;
    info!(concern_id = concern.id, category = %concern.category, "concern filed");
    Ok((StatusCode::CREATED, Json(concern.to_response())))
}

#[utoipa::path(
    get,
    path = "/api/concerns/{id}",
    tag = "concerns",
    params(("id" = i64, Path, description = "Concern id")),
    responses(
        (status = 200, description = "Concern", body = ConcernResponse),
        (status = 404, description = "No such concern"),
    )
)]
pub async fn get_concern(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ConcernResponse>, ServerError> {
    let concern = state.store.get_concern(id).await?.ok_or_else(|| concern_not_found(id))?;
    Ok(Json(concern.to_response()))
}

#[utoipa::path(
    patch,
    path = "/api/concerns/{id}/respond",
    tag = "concerns",
    params(("id" = i64, Path, description = "Concern id")),
    request_body = RespondRequest,
    responses(
        (status = 200, description = "Concern marked responded", body = ConcernResponse),
        (status = 400, description = "Empty response"),
        (status = 404, description = "No such concern"),
    )
)]
pub async fn respond_to_concern(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    payload: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<ConcernResponse>, ServerError> {
    let Json(req) = payload?;
    let response = req.response.trim();
    if response.is_empty() {
        return Err(ServerError::BadRequest("Response cannot be empty".into()));
    }
    let concern = state
        .store
        .respond_to_concern(id, response)
        .await?
        .ok_or_else(|| concern_not_found(id))?;
    info!(concern_id = id, "concern responded");
    Ok(Json(concern.to_response()))
}

#[utoipa::path(
    post,
    path = "/api/concerns/{id}/upvote",
    tag = "concerns",
    params(("id" = i64, Path, description = "Concern id")),
    responses(
        (status = 200, description = "New upvote count", body = UpvoteResponse),
        (status = 404, description = "No such concern"),
    )
)]
pub async fn upvote_concern(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UpvoteResponse>, ServerError> {
    let upvotes = state.store.upvote_concern(id).await?.ok_or_else(|| concern_not_found(id))?;
    Ok(Json(UpvoteResponse { upvotes }))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "concerns",
    responses((status = 200, description = "Concern categories", body = Vec<String>))
)]
pub async fn list_categories() -> Json<Vec<&'static str>> {
    Json(CONCERN_CATEGORIES.to_vec())
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test::{request, send};
    use crate::state::test_state;

    fn concern(title: &str, category: &str) -> serde_json::Value {
        json!({ "title": title, "content": "details", "category": category })
    }

    #[tokio::test]
    async fn categories_are_listed_in_order() {
        let state = test_state(None).await;
        let (status, body) = send(&state, request("GET", "/api/categories", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 7);
        assert_eq!(body[0], "General Health");
        assert_eq!(body[6], "Chronic Diseases");
    }

    #[tokio::test]
    async fn create_validates_category_and_fields() {
        let state = test_state(None).await;
        let (status, body) = send(&state, request("POST", "/api/concerns", Some(concern("Rash", "Dermatology")))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Dermatology"));

        let (status, _) = send(&state, request("POST", "/api/concerns", Some(concern(" ", "Nutrition")))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) = send(&state, request("POST", "/api/concerns", Some(concern("Diet", "Nutrition")))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "open");
        assert_eq!(created["upvotes"], 0);
        assert!(created["responded_at"].is_null());
    }

    #[tokio::test]
    async fn list_filters_and_rejects_unknown_status() {
        let state = test_state(None).await;
        send(&state, request("POST", "/api/concerns", Some(concern("Sleep trouble", "Mental Health")))).await;
        send(&state, request("POST", "/api/concerns", Some(concern("Baby fever", "Pediatrics")))).await;

        let (_, found) = send(&state, request("GET", "/api/concerns?search=SLEEP", None)).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["title"], "Sleep trouble");

        let (_, by_category) = send(&state, request("GET", "/api/concerns?category=Pediatrics", None)).await;
        assert_eq!(by_category[0]["title"], "Baby fever");

        let (_, open) = send(&state, request("GET", "/api/concerns?status=open", None)).await;
        assert_eq!(open.as_array().unwrap().len(), 2);

        let (status, _) = send(&state, request("GET", "/api/concerns?status=pending", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn respond_and_upvote() {
        let state = test_state(None).await;
        let (_, created) = send(&state, request("POST", "/api/concerns", Some(concern("Diet", "Nutrition")))).await;
        let id = created["id"].as_i64().unwrap();

        let (_, upvoted) = send(&state, request("POST", &format!("/api/concerns/{id}/upvote"), None)).await;
        assert_eq!(upvoted["upvotes"], 1);

        let (status, responded) = send(
            &state,
            request("PATCH", &format!("/api/concerns/{id}/respond"), Some(json!({ "response": "Eat greens" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(responded["status"], "responded");
        assert_eq!(responded["response"], "Eat greens");
        assert!(responded["responded_at"].is_string());

        let (_, fetched) = send(&state, request("GET", &format!("/api/concerns/{id}"), None)).await;
        assert_eq!(fetched["upvotes"], 1);
    }

    #[tokio::test]
    async fn missing_concern_is_not_found() {
        let state = test_state(None).await;
        let (status, _) = send(&state, request("GET", "/api/concerns/9", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&state, request("POST", "/api/concerns/9/upvote", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &state,
            request("PATCH", "/api/concerns/9/respond", Some(json!({ "response": "ok" }))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
