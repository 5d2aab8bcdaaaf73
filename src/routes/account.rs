use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::models::AccountView;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /account/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<Value>> {
    state
        .account_service
        .register(&req.username, &req.password)
        .await?;
    Ok(Json(json!({ "message": "account created" })))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /account/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    let token = state
        .account_service
        .login(&req.username, &req.password)
        .await?;
    Ok(Json(json!({ "token": token })))
}

/// POST /account/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Value>> {
    state.account_service.logout(user.account_id).await?;
    Ok(Json(json!({ "message": "logged out" })))
}

#[derive(Deserialize)]
pub struct RenameRequest {
    #[serde(default)]
    pub new_username: String,
}

/// POST /account/rename. Returns a fresh token; the old one is revoked the
/// moment the rename commits.
pub async fn rename(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<RenameRequest>,
) -> AppResult<Json<Value>> {
    let token = state
        .account_service
        .rename(user.account_id, &req.new_username)
        .await?;
    Ok(Json(json!({ "token": token })))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// POST /account/changePassword. Also invalidates the active token.
pub async fn change_password(
    State(state): State<AppState>,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<Value>> {
    state
        .account_service
        .change_password(&req.username, &req.old_password, &req.new_password)
        .await?;
    Ok(Json(json!({ "message": "successfully password changed" })))
}

#[derive(Deserialize)]
pub struct FindByIdRequest {
    #[serde(default)]
    pub id: i64,
}

/// POST /account/findByID
pub async fn find_by_id(
    State(state): State<AppState>,
    Json(req): Json<FindByIdRequest>,
) -> AppResult<Json<AccountView>> {
    if req.id <= 0 {
        return Err(AppError::BadRequest("id is required".into()));
    }
    let account = state.account_service.find_by_id(req.id).await?;
    Ok(Json(account))
}

#[derive(Deserialize)]
pub struct FindByUsernameRequest {
    #[serde(default)]
    pub username: String,
}

/// POST /account/findByUsername
pub async fn find_by_username(
    State(state): State<AppState>,
    Json(req): Json<FindByUsernameRequest>,
) -> AppResult<Json<AccountView>> {
    if req.username.trim().is_empty() {
        return Err(AppError::BadRequest("username is required".into()));
    }
    let account = state.account_service.find_by_username(&req.username).await?;
    Ok(Json(account))
}
