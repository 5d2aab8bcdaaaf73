use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::models::Video;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct PublishVideoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub play_url: String,
    #[serde(default)]
    pub cover_url: String,
}

/// POST /video/publish
pub async fn publish(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PublishVideoRequest>,
) -> AppResult<Json<Video>> {
    let video = state
        .video_service
        .publish(
            user.account_id,
            &user.username,
            &req.title,
            &req.description,
            &req.play_url,
            &req.cover_url,
        )
        .await?;
    Ok(Json(video))
}

#[derive(Deserialize)]
pub struct DeleteVideoRequest {
    #[serde(default)]
    pub id: i64,
}

/// POST /video/delete. Owner only.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<DeleteVideoRequest>,
) -> AppResult<Json<Value>> {
    if req.id <= 0 {
        return Err(AppError::BadRequest("id is required".into()));
    }
    state.video_service.delete(req.id, user.account_id).await?;
    Ok(Json(json!({ "message": "video deleted" })))
}

#[derive(Deserialize)]
pub struct GetDetailRequest {
    #[serde(default)]
    pub id: i64,
}

/// POST /video/getDetail. Cache-aside, TTL 5m.
pub async fn get_detail(
    State(state): State<AppState>,
    Json(req): Json<GetDetailRequest>,
) -> AppResult<Json<Video>> {
    if req.id <= 0 {
        return Err(AppError::BadRequest("id is required".into()));
    }
    let video = state.video_service.get_detail(req.id).await?;
    Ok(Json(video))
}

#[derive(Deserialize)]
pub struct ListByAuthorRequest {
    #[serde(default)]
    pub author_id: i64,
}

/// POST /video/listByAuthorID
pub async fn list_by_author(
    State(state): State<AppState>,
    Json(req): Json<ListByAuthorRequest>,
) -> AppResult<Json<Value>> {
    if req.author_id <= 0 {
        return Err(AppError::BadRequest("author_id is required".into()));
    }
    let videos = state.video_service.list_by_author(req.author_id).await?;
    Ok(Json(json!({ "video_list": videos })))
}
