use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct LikeRequest {
    #[serde(default)]
    pub video_id: i64,
}

/// POST /like/like
pub async fn like(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<LikeRequest>,
) -> AppResult<Json<Value>> {
    if req.video_id <= 0 {
        return Err(AppError::BadRequest("video_id is required".into()));
    }
    state.like_service.like(req.video_id, user.account_id).await?;
    Ok(Json(json!({ "message": "liked" })))
}

/// POST /like/unlike
pub async fn unlike(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<LikeRequest>,
) -> AppResult<Json<Value>> {
    if req.video_id <= 0 {
        return Err(AppError::BadRequest("video_id is required".into()));
    }
    state
        .like_service
        .unlike(req.video_id, user.account_id)
        .await?;
    Ok(Json(json!({ "message": "unliked" })))
}

/// POST /like/isLiked
pub async fn is_liked(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<LikeRequest>,
) -> AppResult<Json<Value>> {
    if req.video_id <= 0 {
        return Err(AppError::BadRequest("video_id is required".into()));
    }
    let liked = state
        .like_service
        .is_liked(req.video_id, user.account_id)
        .await?;
    Ok(Json(json!({ "is_liked": liked })))
}

/// POST /like/listMyLikedVideos. Takes no body.
pub async fn list_my_liked_videos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Value>> {
    let videos = state.like_service.list_liked_videos(user.account_id).await?;
    Ok(Json(json!({ "video_list": videos })))
}
