//! Comment publish / delete / listing. Publish follows the dual-publish
//! protocol (state event + popularity event, per-target fallback); delete
//! publishes the state event only and carries no popularity adjustment.

use crate::cache::CacheClient;
use crate::error::{AppError, AppResult};
use crate::events::{CommentEvent, EventPublisher, PopularityEvent};
use crate::models::Comment;
use crate::repository::comments::CommentRepository;
use crate::repository::videos::VideoRepository;
use crate::services::video::update_popularity_window;

#[derive(Clone)]
pub struct CommentService {
    repo: CommentRepository,
    videos: VideoRepository,
    cache: Option<CacheClient>,
    events: Option<EventPublisher>,
}

impl CommentService {
    pub fn new(
        repo: CommentRepository,
        videos: VideoRepository,
        cache: Option<CacheClient>,
        events: Option<EventPublisher>,
    ) -> Self {
        Self {
            repo,
            videos,
            cache,
            events,
        }
    }

    pub async fn publish(
        &self,
        video_id: i64,
        author_id: i64,
        author_username: &str,
        content: &str,
    ) -> AppResult<()> {
        let author_username = author_username.trim();
        let content = content.trim();
        if video_id <= 0 || author_id <= 0 {
            return Err(AppError::BadRequest(
                "video_id and author_id are required".into(),
            ));
        }
        if content.is_empty() {
            return Err(AppError::BadRequest("content is required".into()));
        }
        if !self.videos.is_exist(video_id).await? {
            return Err(AppError::BadRequest("video not found".into()));
        }

        let mut state_enqueued = false;
        let mut popularity_enqueued = false;
        if let Some(events) = &self.events {
            let evt = CommentEvent::publish(author_username, video_id, author_id, content);
            state_enqueued = events.publish_comment(&evt).await.is_ok();

            let pop = PopularityEvent::update(video_id, 1);
            popularity_enqueued = events.publish_popularity(&pop).await.is_ok();
        }
        if state_enqueued && popularity_enqueued {
            return Ok(());
        }

        if !state_enqueued {
            self.apply_publish_direct(video_id, author_id, author_username, content)
                .await?;
        }
        if !popularity_enqueued {
            if let Some(cache) = &self.cache {
                update_popularity_window(cache, video_id, 1).await;
            }
        }
        Ok(())
    }

    /// Deletable only by the authoring account; non-owners get 403.
    pub async fn delete(&self, comment_id: i64, account_id: i64) -> AppResult<()> {
        let comment = self
            .repo
            .get_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("comment not found".into()))?;

        if comment.author_id != account_id {
            return Err(AppError::Forbidden("permission denied".into()));
        }

        if let Some(events) = &self.events {
            let evt = CommentEvent::delete(comment_id);
            if events.publish_comment(&evt).await.is_ok() {
                return Ok(());
            }
        }

        self.repo.delete(comment_id).await?;
        Ok(())
    }

    pub async fn list_all(&self, video_id: i64) -> AppResult<Vec<Comment>> {
        if !self.videos.is_exist(video_id).await? {
            return Err(AppError::BadRequest("video not found".into()));
        }
        Ok(self.repo.list_for_video(video_id).await?)
    }

    /// Fallback transaction: comment row and popularity bump commit together.
    async fn apply_publish_direct(
        &self,
        video_id: i64,
        author_id: i64,
        author_username: &str,
        content: &str,
    ) -> AppResult<()> {
        let mut tx = self.videos.pool().begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM videos WHERE id = $1)")
            .bind(video_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::BadRequest("video not found".into()));
        }

        sqlx::query(
            "INSERT INTO comments (video_id, author_id, author_username, content) VALUES ($1, $2, $3, $4)",
        )
        .bind(video_id)
        .bind(author_id)
        .bind(author_username)
        .bind(content)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE videos SET popularity = popularity + 1 WHERE id = $1")
            .bind(video_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
