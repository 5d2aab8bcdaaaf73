//! Video publish / delete / detail / author listing, plus the direct
//! popularity-window path shared with the interaction fallbacks.

use crate::cache::{cached_or_build, keys, CacheClient};
use crate::error::{AppError, AppResult};
use crate::models::Video;
use crate::repository::videos::VideoRepository;
use chrono::Utc;
use std::time::Duration;

const DETAIL_TTL: Duration = Duration::from_secs(5 * 60);
const DETAIL_LEASE_TTL: Duration = Duration::from_secs(2);
const HOT_BUCKET_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Direct popularity path, taken when the popularity event could not be
/// published: invalidate the cached detail and fold the delta into the
/// current minute bucket, refreshing the bucket's 2h TTL.
pub async fn update_popularity_window(cache: &CacheClient, video_id: i64, change: i64) {
    if video_id == 0 || change == 0 {
        return;
    }

    let _ = cache.del(&keys::video_detail(video_id)).await;

    let minute = keys::minute_floor(Utc::now());
    let bucket = keys::hot_bucket(minute);
    let member = video_id.to_string();
    if let Err(e) = cache.zincr_by(&bucket, &member, change as f64).await {
        tracing::warn!(error = %e, video_id, "hot bucket increment failed");
        return;
    }
    let _ = cache.expire(&bucket, HOT_BUCKET_TTL).await;
}

#[derive(Clone)]
pub struct VideoService {
    repo: VideoRepository,
    cache: Option<CacheClient>,
}

impl VideoService {
    pub fn new(repo: VideoRepository, cache: Option<CacheClient>) -> Self {
        Self { repo, cache }
    }

    pub async fn publish(
        &self,
        author_id: i64,
        author_username: &str,
        title: &str,
        description: &str,
        play_url: &str,
        cover_url: &str,
    ) -> AppResult<Video> {
        let title = title.trim();
        let play_url = play_url.trim();
        let cover_url = cover_url.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("title is required".into()));
        }
        if play_url.is_empty() {
            return Err(AppError::BadRequest("play_url is required".into()));
        }
        if cover_url.is_empty() {
            return Err(AppError::BadRequest("cover_url is required".into()));
        }

        let video = self
            .repo
            .create(
                author_id,
                author_username,
                title,
                description.trim(),
                play_url,
                cover_url,
            )
            .await?;
        Ok(video)
    }

    /// Owner-only. Invalidates the cached detail after the row is gone.
    pub async fn delete(&self, id: i64, account_id: i64) -> AppResult<()> {
        let video = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::BadRequest("video not found".into()))?;

        if video.author_id != account_id {
            return Err(AppError::Forbidden("permission denied".into()));
        }

        self.repo.delete(id).await?;

        if let Some(cache) = &self.cache {
            let _ = cache.del(&keys::video_detail(id)).await;
        }
        Ok(())
    }

    /// Cache-aside with a 2s rebuild lease; detail entries live 5 minutes
    /// and are invalidated on delete and on popularity change.
    pub async fn get_detail(&self, id: i64) -> AppResult<Video> {
        let load = || async move {
            self.repo
                .get_by_id(id)
                .await?
                .ok_or_else(|| AppError::BadRequest("video not found".into()))
        };

        match &self.cache {
            Some(cache) => {
                cached_or_build(
                    cache,
                    &keys::video_detail(id),
                    DETAIL_TTL,
                    DETAIL_LEASE_TTL,
                    load,
                )
                .await
            }
            None => load().await,
        }
    }

    pub async fn list_by_author(&self, author_id: i64) -> AppResult<Vec<Video>> {
        Ok(self.repo.list_by_author(author_id).await?)
    }
}
