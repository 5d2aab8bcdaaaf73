//! Applies comment publish/delete events. Delete is a load-then-delete so a
//! replay of an already-deleted comment is a no-op.

use crate::events::CommentEvent;
use crate::repository::comments::CommentRepository;
use crate::repository::videos::VideoRepository;
use anyhow::Result;
use rdkafka::consumer::StreamConsumer;
use tokio::sync::watch;

pub fn decode(body: &[u8]) -> Option<CommentEvent> {
    let event: CommentEvent = serde_json::from_slice(body).ok()?;
    match event.action.as_str() {
        "publish" => {
            let video_id = event.video_id?;
            let author_id = event.author_id?;
            let content_ok = event
                .content
                .as_deref()
                .map(|c| !c.trim().is_empty())
                .unwrap_or(false);
            if video_id <= 0 || author_id <= 0 || !content_ok {
                return None;
            }
            Some(event)
        }
        "delete" => {
            if event.comment_id? <= 0 {
                return None;
            }
            Some(event)
        }
        _ => None,
    }
}

pub struct CommentWorker {
    comments: CommentRepository,
    videos: VideoRepository,
}

impl CommentWorker {
    pub fn new(comments: CommentRepository, videos: VideoRepository) -> Self {
        Self { comments, videos }
    }

    pub async fn run(self, consumer: StreamConsumer, shutdown: watch::Receiver<bool>) {
        let worker = &self;
        super::run_consumer(consumer, "comment", shutdown, move |body| async move {
            worker.process(&body).await
        })
        .await;
    }

    async fn process(&self, body: &[u8]) -> Result<()> {
        let Some(event) = decode(body) else {
            return Ok(());
        };
        match event.action.as_str() {
            "publish" => self.apply_publish(&event).await,
            "delete" => self.apply_delete(&event).await,
            _ => Ok(()),
        }
    }

    async fn apply_publish(&self, event: &CommentEvent) -> Result<()> {
        let video_id = event.video_id.unwrap_or_default();
        let author_id = event.author_id.unwrap_or_default();
        let username = event.username.as_deref().unwrap_or_default().trim();
        let content = event.content.as_deref().unwrap_or_default().trim();

        if !self.videos.is_exist(video_id).await? {
            return Ok(());
        }
        self.comments
            .create(video_id, author_id, username, content)
            .await?;
        self.videos.change_popularity(video_id, 1).await?;
        Ok(())
    }

    async fn apply_delete(&self, event: &CommentEvent) -> Result<()> {
        let comment_id = event.comment_id.unwrap_or_default();
        let Some(comment) = self.comments.get_by_id(comment_id).await? else {
            return Ok(());
        };
        self.comments.delete(comment.id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payloads_are_dropped() {
        assert!(decode(b"{").is_none());
        assert!(decode(b"{\"action\":\"publish\"}").is_none());
    }

    #[test]
    fn publish_requires_content() {
        let evt = CommentEvent::publish("alice", 5, 3, "   ");
        let body = serde_json::to_vec(&evt).unwrap();
        assert!(decode(&body).is_none());

        let evt = CommentEvent::publish("alice", 5, 3, "nice video");
        let body = serde_json::to_vec(&evt).unwrap();
        assert!(decode(&body).is_some());
    }

    #[test]
    fn delete_requires_comment_id() {
        let evt = CommentEvent::delete(0);
        let body = serde_json::to_vec(&evt).unwrap();
        assert!(decode(&body).is_none());

        let evt = CommentEvent::delete(12);
        let body = serde_json::to_vec(&evt).unwrap();
        let decoded = decode(&body).unwrap();
        assert_eq!(decoded.comment_id, Some(12));
    }
}
