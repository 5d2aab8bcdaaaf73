//! Applies like/unlike events. Idempotence comes from the unique like row:
//! only an insert that actually created a row (or a delete that actually
//! removed one) moves the counters, so replays are harmless.

use crate::events::LikeEvent;
use crate::repository::likes::LikeRepository;
use crate::repository::videos::VideoRepository;
use anyhow::Result;
use rdkafka::consumer::StreamConsumer;
use tokio::sync::watch;

/// None for anything that must be dropped rather than retried: malformed
/// payloads, missing ids, unknown actions.
pub fn decode(body: &[u8]) -> Option<LikeEvent> {
    let event: LikeEvent = serde_json::from_slice(body).ok()?;
    if event.user_id <= 0 || event.video_id <= 0 {
        return None;
    }
    match event.action.as_str() {
        "like" | "unlike" => Some(event),
        _ => None,
    }
}

pub struct LikeWorker {
    likes: LikeRepository,
    videos: VideoRepository,
}

impl LikeWorker {
    pub fn new(likes: LikeRepository, videos: VideoRepository) -> Self {
        Self { likes, videos }
    }

    pub async fn run(self, consumer: StreamConsumer, shutdown: watch::Receiver<bool>) {
        let worker = &self;
        super::run_consumer(consumer, "like", shutdown, move |body| async move {
            worker.process(&body).await
        })
        .await;
    }

    async fn process(&self, body: &[u8]) -> Result<()> {
        let Some(event) = decode(body) else {
            return Ok(());
        };
        match event.action.as_str() {
            "like" => self.apply_like(event.user_id, event.video_id).await,
            "unlike" => self.apply_unlike(event.user_id, event.video_id).await,
            _ => Ok(()),
        }
    }

    async fn apply_like(&self, user_id: i64, video_id: i64) -> Result<()> {
        // The video may have been deleted since the event was enqueued.
        if !self.videos.is_exist(video_id).await? {
            return Ok(());
        }
        let created = self.likes.create_ignore_duplicate(video_id, user_id).await?;
        if !created {
            return Ok(());
        }
        self.videos.change_likes_count(video_id, 1).await?;
        self.videos.change_popularity(video_id, 1).await?;
        Ok(())
    }

    async fn apply_unlike(&self, user_id: i64, video_id: i64) -> Result<()> {
        if !self.videos.is_exist(video_id).await? {
            return Ok(());
        }
        let deleted = self.likes.delete(video_id, user_id).await?;
        if !deleted {
            return Ok(());
        }
        self.videos.change_likes_count(video_id, -1).await?;
        self.videos.change_popularity(video_id, -1).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LikeEvent;

    #[test]
    fn malformed_payloads_are_dropped() {
        assert!(decode(b"not json").is_none());
        assert!(decode(b"{}").is_none());
    }

    #[test]
    fn zero_ids_are_dropped() {
        let mut evt = LikeEvent::like(0, 5);
        let body = serde_json::to_vec(&evt).unwrap();
        assert!(decode(&body).is_none());

        evt = LikeEvent::like(5, 0);
        let body = serde_json::to_vec(&evt).unwrap();
        assert!(decode(&body).is_none());
    }

    #[test]
    fn unknown_actions_are_dropped() {
        let mut evt = LikeEvent::like(1, 2);
        evt.action = "superlike".into();
        let body = serde_json::to_vec(&evt).unwrap();
        assert!(decode(&body).is_none());
    }

    #[test]
    fn valid_events_decode() {
        let evt = LikeEvent::unlike(3, 7);
        let body = serde_json::to_vec(&evt).unwrap();
        let decoded = decode(&body).unwrap();
        assert_eq!(decoded.action, "unlike");
        assert_eq!(decoded.user_id, 3);
        assert_eq!(decoded.video_id, 7);
    }
}
