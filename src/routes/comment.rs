use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct PublishCommentRequest {
    #[serde(default)]
    pub video_id: i64,
    #[serde(default)]
    pub content: String,
}

/// POST /comment/publish
pub async fn publish(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PublishCommentRequest>,
) -> AppResult<Json<Value>> {
    if req.video_id <= 0 {
        return Err(AppError::BadRequest("video_id is required".into()));
    }
    state
        .comment_service
        .publish(req.video_id, user.account_id, &user.username, &req.content)
        .await?;
    Ok(Json(json!({ "message": "comment published" })))
}

#[derive(Deserialize)]
pub struct DeleteCommentRequest {
    #[serde(default)]
    pub comment_id: i64,
}

/// POST /comment/delete. Author only.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<DeleteCommentRequest>,
) -> AppResult<Json<Value>> {
    if req.comment_id <= 0 {
        return Err(AppError::BadRequest("comment_id is required".into()));
    }
    state
        .comment_service
        .delete(req.comment_id, user.account_id)
        .await?;
    Ok(Json(json!({ "message": "comment deleted" })))
}

#[derive(Deserialize)]
pub struct ListAllRequest {
    #[serde(default)]
    pub video_id: i64,
}

/// POST /comment/listAll. Most recent first.
pub async fn list_all(
    State(state): State<AppState>,
    Json(req): Json<ListAllRequest>,
) -> AppResult<Json<Value>> {
    if req.video_id <= 0 {
        return Err(AppError::BadRequest("video_id is required".into()));
    }
    let comments = state.comment_service.list_all(req.video_id).await?;
    Ok(Json(json!({ "comment_list": comments })))
}
