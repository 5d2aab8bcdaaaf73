//! Kafka producer behind the publish-or-report-failure contract. A returned
//! error (including the send timeout) is the caller's signal to take the
//! direct-write fallback for that target.

use super::{CommentEvent, EventTopic, LikeEvent, PopularityEvent, SocialEvent};
use anyhow::Result;
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;
use tracing::warn;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct EventPublisher {
    producer: FutureProducer,
}

impl EventPublisher {
    pub fn new(brokers: &str) -> Result<Self> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", "clipfeed")
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "5")
            .set("retries", "3")
            .set("linger.ms", "5")
            .create::<FutureProducer>()?;
        Ok(Self { producer })
    }

    pub async fn publish_like(&self, event: &LikeEvent) -> Result<()> {
        self.publish(EventTopic::Like, &event.routing_key(), event.video_id, event)
            .await
    }

    pub async fn publish_comment(&self, event: &CommentEvent) -> Result<()> {
        let partition_id = event.video_id.or(event.comment_id).unwrap_or_default();
        self.publish(EventTopic::Comment, &event.routing_key(), partition_id, event)
            .await
    }

    pub async fn publish_social(&self, event: &SocialEvent) -> Result<()> {
        self.publish(
            EventTopic::Social,
            &event.routing_key(),
            event.vlogger_id,
            event,
        )
        .await
    }

    pub async fn publish_popularity(&self, event: &PopularityEvent) -> Result<()> {
        self.publish(
            EventTopic::Popularity,
            event.routing_key(),
            event.video_id,
            event,
        )
        .await
    }

    async fn publish<T: serde::Serialize>(
        &self,
        topic: EventTopic,
        routing_key: &str,
        partition_id: i64,
        payload: &T,
    ) -> Result<()> {
        let body = serde_json::to_string(payload)?;
        let partition_key = partition_id.to_string();

        let headers = OwnedHeaders::new().insert(Header {
            key: "event_type",
            value: Some(routing_key),
        });

        let record = FutureRecord::to(topic.topic())
            .key(&partition_key)
            .payload(&body)
            .headers(headers);

        match self.producer.send(record, SEND_TIMEOUT).await {
            Ok(_) => Ok(()),
            Err((err, _)) => {
                warn!(
                    topic = topic.topic(),
                    event_type = routing_key,
                    error = %err,
                    "event publish failed"
                );
                Err(anyhow::anyhow!("publish failed: {err}"))
            }
        }
    }
}
