//! Applies follow/unfollow events. The pair constraint makes both directions
//! idempotent: a duplicate follow inserts nothing, an unfollow of a missing
//! edge deletes nothing.

use crate::events::SocialEvent;
use crate::repository::social::SocialRepository;
use anyhow::Result;
use rdkafka::consumer::StreamConsumer;
use tokio::sync::watch;

pub fn decode(body: &[u8]) -> Option<SocialEvent> {
    let event: SocialEvent = serde_json::from_slice(body).ok()?;
    if event.follower_id <= 0 || event.vlogger_id <= 0 {
        return None;
    }
    match event.action.as_str() {
        "follow" | "unfollow" => Some(event),
        _ => None,
    }
}

pub struct SocialWorker {
    repo: SocialRepository,
}

impl SocialWorker {
    pub fn new(repo: SocialRepository) -> Self {
        Self { repo }
    }

    pub async fn run(self, consumer: StreamConsumer, shutdown: watch::Receiver<bool>) {
        let worker = &self;
        super::run_consumer(consumer, "social", shutdown, move |body| async move {
            worker.process(&body).await
        })
        .await;
    }

    async fn process(&self, body: &[u8]) -> Result<()> {
        let Some(event) = decode(body) else {
            return Ok(());
        };
        match event.action.as_str() {
            "follow" => {
                self.repo.follow(event.follower_id, event.vlogger_id).await?;
            }
            "unfollow" => {
                self.repo
                    .unfollow(event.follower_id, event.vlogger_id)
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payloads_are_dropped() {
        assert!(decode(b"!!").is_none());
    }

    #[test]
    fn zero_ids_are_dropped() {
        let evt = SocialEvent::follow(0, 2);
        let body = serde_json::to_vec(&evt).unwrap();
        assert!(decode(&body).is_none());
    }

    #[test]
    fn valid_events_decode() {
        let evt = SocialEvent::unfollow(4, 9);
        let body = serde_json::to_vec(&evt).unwrap();
        let decoded = decode(&body).unwrap();
        assert_eq!(decoded.action, "unfollow");
        assert_eq!(decoded.follower_id, 4);
        assert_eq!(decoded.vlogger_id, 9);
    }
}
