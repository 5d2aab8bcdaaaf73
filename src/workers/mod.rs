//! Long-running consumers, one per domain topic.
//!
//! Each consumer commits an offset only after the message's effects are
//! committed (ack-on-success). A transient failure rewinds the partition to
//! the failed offset so the message is redelivered (requeue); malformed
//! payloads and logical non-errors are committed and dropped so a poison
//! message can never wedge the queue.

pub mod comment_worker;
pub mod like_worker;
pub mod popularity_worker;
pub mod social_worker;

pub use comment_worker::CommentWorker;
pub use like_worker::LikeWorker;
pub use popularity_worker::PopularityWorker;
pub use social_worker::SocialWorker;

use crate::cache::CacheClient;
use crate::config::Config;
use crate::events::EventTopic;
use crate::repository::comments::CommentRepository;
use crate::repository::likes::LikeRepository;
use crate::repository::social::SocialRepository;
use crate::repository::videos::VideoRepository;
use anyhow::Result;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::Offset;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const RETRY_PAUSE: Duration = Duration::from_secs(1);

pub(crate) fn build_consumer(
    brokers: &str,
    group_id: &str,
    topic: &str,
) -> Result<StreamConsumer, KafkaError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "45000")
        .set("max.poll.interval.ms", "300000")
        // Bounded in-memory backlog per consumer
        .set("queued.min.messages", "50")
        .create()?;
    consumer.subscribe(&[topic])?;
    Ok(consumer)
}

/// Shared consume loop. `handler` returns Ok to ack; an error rewinds the
/// partition so the broker redelivers the message after a pause.
pub(crate) async fn run_consumer<F, Fut>(
    consumer: StreamConsumer,
    label: &str,
    mut shutdown: watch::Receiver<bool>,
    handler: F,
) where
    F: Fn(Vec<u8>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    info!(worker = label, "consumer started");
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!(worker = label, "consumer shutting down");
                return;
            }
            received = consumer.recv() => match received {
                Ok(msg) => {
                    let Some(payload) = msg.payload() else {
                        let _ = consumer.commit_message(&msg, CommitMode::Async);
                        continue;
                    };
                    match handler(payload.to_vec()).await {
                        Ok(()) => {
                            if let Err(e) = consumer.commit_message(&msg, CommitMode::Async) {
                                warn!(worker = label, error = %e, "offset commit failed");
                            }
                        }
                        Err(e) => {
                            warn!(worker = label, error = %e, "processing failed, requeueing");
                            if let Err(se) = consumer.seek(
                                msg.topic(),
                                msg.partition(),
                                Offset::Offset(msg.offset()),
                                Duration::from_secs(1),
                            ) {
                                error!(worker = label, error = %se, "seek for requeue failed");
                            }
                            tokio::time::sleep(RETRY_PAUSE).await;
                        }
                    }
                }
                Err(e) => {
                    error!(worker = label, error = %e, "kafka receive error");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }
    }
}

/// Start one consumer task per domain topic. The popularity worker needs the
/// cache and is skipped without it, mirroring the read path's degradation.
pub fn spawn_all(
    config: &Config,
    pool: PgPool,
    cache: Option<CacheClient>,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<()>>> {
    let brokers = config.kafka_brokers.clone();
    let prefix = config.kafka_group_prefix.clone();
    let mut handles = Vec::new();

    let like_worker = LikeWorker::new(
        LikeRepository::new(pool.clone()),
        VideoRepository::new(pool.clone()),
    );
    let consumer = build_consumer(
        &brokers,
        &format!("{prefix}-like-worker"),
        EventTopic::Like.topic(),
    )?;
    let rx = shutdown.clone();
    handles.push(tokio::spawn(async move {
        like_worker.run(consumer, rx).await;
    }));

    let comment_worker = CommentWorker::new(
        CommentRepository::new(pool.clone()),
        VideoRepository::new(pool.clone()),
    );
    let consumer = build_consumer(
        &brokers,
        &format!("{prefix}-comment-worker"),
        EventTopic::Comment.topic(),
    )?;
    let rx = shutdown.clone();
    handles.push(tokio::spawn(async move {
        comment_worker.run(consumer, rx).await;
    }));

    let social_worker = SocialWorker::new(SocialRepository::new(pool.clone()));
    let consumer = build_consumer(
        &brokers,
        &format!("{prefix}-social-worker"),
        EventTopic::Social.topic(),
    )?;
    let rx = shutdown.clone();
    handles.push(tokio::spawn(async move {
        social_worker.run(consumer, rx).await;
    }));

    match cache {
        Some(cache) => {
            let popularity_worker = PopularityWorker::new(cache);
            let consumer = build_consumer(
                &brokers,
                &format!("{prefix}-popularity-worker"),
                EventTopic::Popularity.topic(),
            )?;
            let rx = shutdown.clone();
            handles.push(tokio::spawn(async move {
                popularity_worker.run(consumer, rx).await;
            }));
        }
        None => {
            warn!("cache unavailable, popularity worker disabled");
        }
    }

    Ok(handles)
}
