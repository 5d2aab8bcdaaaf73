use crate::cache::CacheClient;
use crate::config::Config;
use crate::events::EventPublisher;
use crate::repository::accounts::AccountRepository;
use crate::repository::comments::CommentRepository;
use crate::repository::feed::FeedRepository;
use crate::repository::likes::LikeRepository;
use crate::repository::social::SocialRepository;
use crate::repository::videos::VideoRepository;
use crate::security::token::TokenKeys;
use crate::services::account::AccountService;
use crate::services::comment::CommentService;
use crate::services::feed::FeedService;
use crate::services::like::LikeService;
use crate::services::social::SocialService;
use crate::services::video::VideoService;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: Option<CacheClient>,
    pub tokens: TokenKeys,
    pub config: Arc<Config>,
    pub accounts: AccountRepository,
    pub account_service: AccountService,
    pub video_service: VideoService,
    pub like_service: LikeService,
    pub comment_service: CommentService,
    pub social_service: SocialService,
    pub feed_service: FeedService,
}

impl AppState {
    /// Wire repositories and services. `cache` and `events` are optional:
    /// a missing cache degrades reads to the database, a missing bus routes
    /// every write through its direct fallback.
    pub fn build(
        config: Arc<Config>,
        db: PgPool,
        cache: Option<CacheClient>,
        events: Option<EventPublisher>,
    ) -> Self {
        let tokens = TokenKeys::from_secret(&config.jwt_secret);

        let accounts = AccountRepository::new(db.clone());
        let videos = VideoRepository::new(db.clone());
        let likes = LikeRepository::new(db.clone());
        let comments = CommentRepository::new(db.clone());
        let social = SocialRepository::new(db.clone());
        let feed = FeedRepository::new(db.clone());

        let account_service =
            AccountService::new(accounts.clone(), cache.clone(), tokens.clone());
        let video_service = VideoService::new(videos.clone(), cache.clone());
        let like_service = LikeService::new(
            likes.clone(),
            videos.clone(),
            cache.clone(),
            events.clone(),
        );
        let comment_service = CommentService::new(
            comments.clone(),
            videos.clone(),
            cache.clone(),
            events.clone(),
        );
        let social_service = SocialService::new(social.clone(), accounts.clone(), events.clone());
        let feed_service = FeedService::new(feed, likes, cache.clone());

        Self {
            db,
            cache,
            tokens,
            config,
            accounts,
            account_service,
            video_service,
            like_service,
            comment_service,
            social_service,
            feed_service,
        }
    }
}
