use crate::middleware::auth::{require_auth, soft_auth};
use crate::state::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

pub mod account;
pub mod comment;
pub mod feed;
pub mod like;
pub mod social;
pub mod video;

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/account/register", post(account::register))
        .route("/account/login", post(account::login))
        .route("/account/changePassword", post(account::change_password))
        .route("/account/findByID", post(account::find_by_id))
        .route("/account/findByUsername", post(account::find_by_username))
        .route("/video/getDetail", post(video::get_detail))
        .route("/video/listByAuthorID", post(video::list_by_author))
        .route("/comment/listAll", post(comment::list_all));

    let authed = Router::new()
        .route("/account/logout", post(account::logout))
        .route("/account/rename", post(account::rename))
        .route("/video/publish", post(video::publish))
        .route("/video/delete", post(video::delete))
        .route("/like/like", post(like::like))
        .route("/like/unlike", post(like::unlike))
        .route("/like/isLiked", post(like::is_liked))
        .route("/like/listMyLikedVideos", post(like::list_my_liked_videos))
        .route("/comment/publish", post(comment::publish))
        .route("/comment/delete", post(comment::delete))
        .route("/social/follow", post(social::follow))
        .route("/social/unfollow", post(social::unfollow))
        .route("/social/isFollowed", post(social::is_followed))
        .route("/social/getAllFollowers", post(social::get_all_followers))
        .route("/social/getAllVloggers", post(social::get_all_vloggers))
        .route("/feed/listByFollowing", post(feed::list_by_following))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // Feed reads personalize when a valid token is presented but admit
    // anonymous callers.
    let soft = Router::new()
        .route("/feed/listLatest", post(feed::list_latest))
        .route("/feed/listLikesCount", post(feed::list_likes_count))
        .route("/feed/listByPopularity", post(feed::list_by_popularity))
        .route_layer(from_fn_with_state(state.clone(), soft_auth));

    Router::new()
        .merge(public)
        .merge(authed)
        .merge(soft)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
