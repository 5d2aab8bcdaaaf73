use crate::error::{AppError, AppResult};
use crate::middleware::auth::{CurrentUser, Viewer};
use crate::repository::feed::{LikesCursor, PopularityCursor};
use crate::services::feed::{
    ListByFollowingResponse, ListByPopularityResponse, ListLatestResponse, ListLikesCountResponse,
};
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::Json;
use chrono::{TimeZone, Utc};
use serde::Deserialize;

/// Out-of-range limits quietly fall back to the default page size.
fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 || limit > 50 {
        10
    } else {
        limit
    }
}

/// The likes-ranked cursor is composite: both halves or neither.
fn likes_cursor(
    likes_count_before: Option<i64>,
    id_before: Option<i64>,
) -> Result<Option<LikesCursor>, AppError> {
    match (likes_count_before, id_before) {
        (None, None) => Ok(None),
        (Some(likes_count), Some(id)) => {
            if likes_count < 0 {
                return Err(AppError::BadRequest(
                    "invalid cursor: likes_count_before must be >= 0".into(),
                ));
            }
            if id == 0 {
                if likes_count != 0 {
                    return Err(AppError::BadRequest(
                        "invalid cursor: id_before must be > 0".into(),
                    ));
                }
                // Zero pair: treated as "no cursor", first page.
                return Ok(None);
            }
            Ok(Some(LikesCursor { likes_count, id }))
        }
        _ => Err(AppError::BadRequest(
            "likes_count_before and id_before must be provided together".into(),
        )),
    }
}

/// DB-fallback cursor for the popularity feed: active only when the time and
/// id halves are both present (popularity itself may legitimately be zero).
fn popularity_cursor(
    latest_popularity: i64,
    latest_before: i64,
    latest_id_before: i64,
) -> Option<PopularityCursor> {
    if latest_before <= 0 || latest_id_before <= 0 {
        return None;
    }
    let create_time = Utc.timestamp_opt(latest_before, 0).single()?;
    Some(PopularityCursor {
        popularity: latest_popularity,
        create_time,
        id: latest_id_before,
    })
}

#[derive(Deserialize)]
pub struct ListLatestRequest {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub latest_time: i64,
}

/// POST /feed/listLatest. Soft auth; cached for anonymous viewers only.
pub async fn list_latest(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<ListLatestRequest>,
) -> AppResult<Json<ListLatestResponse>> {
    let limit = clamp_limit(req.limit);
    let resp = state
        .feed_service
        .list_latest(limit, req.latest_time, viewer.account_id())
        .await?;
    Ok(Json(resp))
}

#[derive(Deserialize)]
pub struct ListLikesCountRequest {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub likes_count_before: Option<i64>,
    #[serde(default)]
    pub id_before: Option<i64>,
}

/// POST /feed/listLikesCount. Soft auth, composite cursor, never cached.
pub async fn list_likes_count(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<ListLikesCountRequest>,
) -> AppResult<Json<ListLikesCountResponse>> {
    let limit = clamp_limit(req.limit);
    let cursor = likes_cursor(req.likes_count_before, req.id_before)?;
    let resp = state
        .feed_service
        .list_likes_count(limit, cursor, viewer.account_id())
        .await?;
    Ok(Json(resp))
}

#[derive(Deserialize)]
pub struct ListByPopularityRequest {
    #[serde(default)]
    pub limit: i64,
    /// Snapshot minute returned by a previous page; 0 means "current minute".
    #[serde(default)]
    pub as_of: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub latest_popularity: i64,
    #[serde(default)]
    pub latest_before: i64,
    #[serde(default)]
    pub latest_id_before: i64,
}

/// POST /feed/listByPopularity. Soft auth; snapshot paging with DB fallback.
pub async fn list_by_popularity(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<ListByPopularityRequest>,
) -> AppResult<Json<ListByPopularityResponse>> {
    let limit = clamp_limit(req.limit);
    if req.offset < 0 {
        return Err(AppError::BadRequest("offset must be >= 0".into()));
    }
    let db_cursor = popularity_cursor(
        req.latest_popularity,
        req.latest_before,
        req.latest_id_before,
    );
    let resp = state
        .feed_service
        .list_by_popularity(limit, req.as_of, req.offset, viewer.account_id(), db_cursor)
        .await?;
    Ok(Json(resp))
}

#[derive(Deserialize)]
pub struct ListByFollowingRequest {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub latest_time: i64,
}

/// POST /feed/listByFollowing. Auth required; cached per viewer.
pub async fn list_by_following(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ListByFollowingRequest>,
) -> AppResult<Json<ListByFollowingResponse>> {
    let limit = clamp_limit(req.limit);
    let resp = state
        .feed_service
        .list_by_following(limit, req.latest_time, user.account_id)
        .await?;
    Ok(Json(resp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped_to_default() {
        assert_eq!(clamp_limit(0), 10);
        assert_eq!(clamp_limit(-3), 10);
        assert_eq!(clamp_limit(51), 10);
        assert_eq!(clamp_limit(1), 1);
        assert_eq!(clamp_limit(50), 50);
    }

    #[test]
    fn likes_cursor_requires_both_halves() {
        assert!(likes_cursor(Some(3), None).is_err());
        assert!(likes_cursor(None, Some(20)).is_err());
        assert!(likes_cursor(None, None).unwrap().is_none());
    }

    #[test]
    fn likes_cursor_valid_pair() {
        let cursor = likes_cursor(Some(3), Some(20)).unwrap().unwrap();
        assert_eq!(cursor.likes_count, 3);
        assert_eq!(cursor.id, 20);
    }

    #[test]
    fn likes_cursor_rejects_negative_and_partial_zero() {
        assert!(likes_cursor(Some(-1), Some(5)).is_err());
        assert!(likes_cursor(Some(7), Some(0)).is_err());
        // The all-zero pair means "first page".
        assert!(likes_cursor(Some(0), Some(0)).unwrap().is_none());
    }

    #[test]
    fn popularity_cursor_needs_time_and_id() {
        assert!(popularity_cursor(5, 0, 3).is_none());
        assert!(popularity_cursor(5, 1_640_000_000, 0).is_none());
        let cursor = popularity_cursor(0, 1_640_000_000, 3).unwrap();
        assert_eq!(cursor.popularity, 0);
        assert_eq!(cursor.id, 3);
        assert_eq!(cursor.create_time.timestamp(), 1_640_000_000);
    }
}
