use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct VloggerRequest {
    #[serde(default)]
    pub vlogger_id: i64,
}

/// POST /social/follow
pub async fn follow(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<VloggerRequest>,
) -> AppResult<Json<Value>> {
    if req.vlogger_id <= 0 {
        return Err(AppError::BadRequest("vlogger_id is required".into()));
    }
    state
        .social_service
        .follow(user.account_id, req.vlogger_id)
        .await?;
    Ok(Json(json!({ "message": "followed" })))
}

/// POST /social/unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<VloggerRequest>,
) -> AppResult<Json<Value>> {
    if req.vlogger_id <= 0 {
        return Err(AppError::BadRequest("vlogger_id is required".into()));
    }
    state
        .social_service
        .unfollow(user.account_id, req.vlogger_id)
        .await?;
    Ok(Json(json!({ "message": "unfollowed" })))
}

/// POST /social/isFollowed
pub async fn is_followed(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<VloggerRequest>,
) -> AppResult<Json<Value>> {
    if req.vlogger_id <= 0 {
        return Err(AppError::BadRequest("vlogger_id is required".into()));
    }
    let followed = state
        .social_service
        .is_followed(user.account_id, req.vlogger_id)
        .await?;
    Ok(Json(json!({ "is_followed": followed })))
}

#[derive(Deserialize)]
pub struct GetAllFollowersRequest {
    /// Defaults to the caller's own account.
    #[serde(default)]
    pub vlogger_id: i64,
}

/// POST /social/getAllFollowers
pub async fn get_all_followers(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<GetAllFollowersRequest>,
) -> AppResult<Json<Value>> {
    let vlogger_id = if req.vlogger_id > 0 {
        req.vlogger_id
    } else {
        user.account_id
    };
    let followers = state.social_service.followers(vlogger_id).await?;
    Ok(Json(json!({ "followers": followers })))
}

#[derive(Deserialize)]
pub struct GetAllVloggersRequest {
    /// Defaults to the caller's own account.
    #[serde(default)]
    pub follower_id: i64,
}

/// POST /social/getAllVloggers
pub async fn get_all_vloggers(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<GetAllVloggersRequest>,
) -> AppResult<Json<Value>> {
    let follower_id = if req.follower_id > 0 {
        req.follower_id
    } else {
        user.account_id
    };
    let vloggers = state.social_service.vloggers(follower_id).await?;
    Ok(Json(json!({ "vloggers": vloggers })))
}
