//! Like / unlike write path.
//!
//! Each write validates, then publishes a state event and a popularity event.
//! A target whose publish failed gets the equivalent direct write before the
//! call returns, so the effect is either durably queued or durably written,
//! and never both, because a failed publish is the only trigger for the
//! direct write on that target.

use crate::cache::CacheClient;
use crate::error::{AppError, AppResult};
use crate::events::{EventPublisher, LikeEvent, PopularityEvent};
use crate::models::Video;
use crate::repository::likes::LikeRepository;
use crate::repository::videos::VideoRepository;
use crate::services::is_unique_violation;
use crate::services::video::update_popularity_window;

#[derive(Clone)]
pub struct LikeService {
    repo: LikeRepository,
    videos: VideoRepository,
    cache: Option<CacheClient>,
    events: Option<EventPublisher>,
}

impl LikeService {
    pub fn new(
        repo: LikeRepository,
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

    pub async fn like(&self, video_id: i64, account_id: i64) -> AppResult<()> {
        if video_id <= 0 || account_id <= 0 {
            return Err(AppError::BadRequest(
                "video_id and account_id are required".into(),
            ));
        }
        if !self.videos.is_exist(video_id).await? {
            return Err(AppError::BadRequest("video not found".into()));
        }
        if self.repo.is_liked(video_id, account_id).await? {
            return Err(AppError::BadRequest("user has liked this video".into()));
        }

        let mut state_enqueued = false;
        let mut popularity_enqueued = false;
        if let Some(events) = &self.events {
            let evt = LikeEvent::like(account_id, video_id);
            state_enqueued = events.publish_like(&evt).await.is_ok();

            let pop = PopularityEvent::update(video_id, 1);
            popularity_enqueued = events.publish_popularity(&pop).await.is_ok();
        }
        if state_enqueued && popularity_enqueued {
            return Ok(());
        }

        if !state_enqueued {
            self.apply_like_direct(video_id, account_id).await?;
        }
        if !popularity_enqueued {
            if let Some(cache) = &self.cache {
                update_popularity_window(cache, video_id, 1).await;
            }
        }
        Ok(())
    }

    pub async fn unlike(&self, video_id: i64, account_id: i64) -> AppResult<()> {
        if video_id <= 0 || account_id <= 0 {
            return Err(AppError::BadRequest(
                "video_id and account_id are required".into(),
            ));
        }
        if !self.videos.is_exist(video_id).await? {
            return Err(AppError::BadRequest("video not found".into()));
        }
        if !self.repo.is_liked(video_id, account_id).await? {
            return Err(AppError::BadRequest("user has not liked this video".into()));
        }

        let mut state_enqueued = false;
        let mut popularity_enqueued = false;
        if let Some(events) = &self.events {
            let evt = LikeEvent::unlike(account_id, video_id);
            state_enqueued = events.publish_like(&evt).await.is_ok();

            let pop = PopularityEvent::update(video_id, -1);
            popularity_enqueued = events.publish_popularity(&pop).await.is_ok();
        }
        if state_enqueued && popularity_enqueued {
            return Ok(());
        }

        if !state_enqueued {
            self.apply_unlike_direct(video_id, account_id).await?;
        }
        if !popularity_enqueued {
            if let Some(cache) = &self.cache {
                update_popularity_window(cache, video_id, -1).await;
            }
        }
        Ok(())
    }

    pub async fn is_liked(&self, video_id: i64, account_id: i64) -> AppResult<bool> {
        Ok(self.repo.is_liked(video_id, account_id).await?)
    }

    pub async fn list_liked_videos(&self, account_id: i64) -> AppResult<Vec<Video>> {
        Ok(self.repo.list_liked_videos(account_id).await?)
    }

    /// Fallback transaction: like row + both counters commit or none do.
    async fn apply_like_direct(&self, video_id: i64, account_id: i64) -> AppResult<()> {
        let mut tx = self.videos.pool().begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM videos WHERE id = $1)")
            .bind(video_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::BadRequest("video not found".into()));
        }

        let insert = sqlx::query("INSERT INTO likes (video_id, account_id) VALUES ($1, $2)")
            .bind(video_id)
            .bind(account_id)
            .execute(&mut *tx)
            .await;
        match insert {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::BadRequest("user has liked this video".into()))
            }
            Err(e) => return Err(e.into()),
        }

        sqlx::query("UPDATE videos SET likes_count = likes_count + 1 WHERE id = $1")
            .bind(video_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE videos SET popularity = popularity + 1 WHERE id = $1")
            .bind(video_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Fallback transaction for unlike; counters are floored at zero.
    async fn apply_unlike_direct(&self, video_id: i64, account_id: i64) -> AppResult<()> {
        let mut tx = self.videos.pool().begin().await?;

        let removed = sqlx::query("DELETE FROM likes WHERE video_id = $1 AND account_id = $2")
            .bind(video_id)
            .bind(account_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(AppError::BadRequest("user has not liked this video".into()));
        }

        sqlx::query("UPDATE videos SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1")
            .bind(video_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE videos SET popularity = GREATEST(popularity - 1, 0) WHERE id = $1")
            .bind(video_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
