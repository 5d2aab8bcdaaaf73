//! Maintains the hot window: each popularity event invalidates the cached
//! video detail and folds its delta into the current minute bucket.

use crate::cache::CacheClient;
use crate::events::PopularityEvent;
use crate::services::video::update_popularity_window;
use anyhow::Result;
use rdkafka::consumer::StreamConsumer;
use tokio::sync::watch;

pub fn decode(body: &[u8]) -> Option<PopularityEvent> {
    let event: PopularityEvent = serde_json::from_slice(body).ok()?;
    if event.video_id <= 0 || event.change == 0 {
        return None;
    }
    Some(event)
}

pub struct PopularityWorker {
    cache: CacheClient,
}

impl PopularityWorker {
    pub fn new(cache: CacheClient) -> Self {
        Self { cache }
    }

    pub async fn run(self, consumer: StreamConsumer, shutdown: watch::Receiver<bool>) {
        let worker = &self;
        super::run_consumer(consumer, "popularity", shutdown, move |body| async move {
            worker.process(&body).await
        })
        .await;
    }

    async fn process(&self, body: &[u8]) -> Result<()> {
        let Some(event) = decode(body) else {
            return Ok(());
        };
        update_popularity_window(&self.cache, event.video_id, event.change).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payloads_are_dropped() {
        assert!(decode(b"nope").is_none());
    }

    #[test]
    fn zero_change_is_dropped() {
        let evt = PopularityEvent::update(5, 0);
        let body = serde_json::to_vec(&evt).unwrap();
        assert!(decode(&body).is_none());
    }

    #[test]
    fn negative_deltas_decode() {
        let evt = PopularityEvent::update(5, -1);
        let body = serde_json::to_vec(&evt).unwrap();
        let decoded = decode(&body).unwrap();
        assert_eq!(decoded.change, -1);
    }
}
