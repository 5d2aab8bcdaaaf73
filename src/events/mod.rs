//! Event bus adapter: one durable topic per interaction domain, JSON
//! envelopes with random 128-bit event ids.
//!
//! The routing key of an event (`like.like`, `comment.publish`, ...) travels
//! both as the envelope `action` and as the `event_type` message header;
//! the partition key is the target entity id so events for one entity stay
//! ordered.

pub mod producer;

pub use producer::EventPublisher;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four interaction domains and their topic / routing-key prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTopic {
    Like,
    Comment,
    Social,
    Popularity,
}

impl EventTopic {
    pub fn topic(self) -> &'static str {
        match self {
            EventTopic::Like => "like.events",
            EventTopic::Comment => "comment.events",
            EventTopic::Social => "social.events",
            EventTopic::Popularity => "video.popularity.events",
        }
    }

    pub fn key_prefix(self) -> &'static str {
        match self {
            EventTopic::Like => "like",
            EventTopic::Comment => "comment",
            EventTopic::Social => "social",
            EventTopic::Popularity => "video.popularity",
        }
    }

    pub fn all() -> [EventTopic; 4] {
        [
            EventTopic::Like,
            EventTopic::Comment,
            EventTopic::Social,
            EventTopic::Popularity,
        ]
    }
}

/// Random 128-bit id rendered as 32 lowercase hex chars.
pub fn new_event_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeEvent {
    pub event_id: String,
    /// "like" or "unlike"
    pub action: String,
    pub user_id: i64,
    pub video_id: i64,
    pub occurred_at: DateTime<Utc>,
}

impl LikeEvent {
    pub fn like(user_id: i64, video_id: i64) -> Self {
        Self::new("like", user_id, video_id)
    }

    pub fn unlike(user_id: i64, video_id: i64) -> Self {
        Self::new("unlike", user_id, video_id)
    }

    fn new(action: &str, user_id: i64, video_id: i64) -> Self {
        Self {
            event_id: new_event_id(),
            action: action.to_string(),
            user_id,
            video_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn routing_key(&self) -> String {
        format!("like.{}", self.action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEvent {
    pub event_id: String,
    /// "publish" or "delete"
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl CommentEvent {
    pub fn publish(username: &str, video_id: i64, author_id: i64, content: &str) -> Self {
        Self {
            event_id: new_event_id(),
            action: "publish".to_string(),
            comment_id: None,
            username: Some(username.to_string()),
            video_id: Some(video_id),
            author_id: Some(author_id),
            content: Some(content.to_string()),
            occurred_at: Utc::now(),
        }
    }

    pub fn delete(comment_id: i64) -> Self {
        Self {
            event_id: new_event_id(),
            action: "delete".to_string(),
            comment_id: Some(comment_id),
            username: None,
            video_id: None,
            author_id: None,
            content: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn routing_key(&self) -> String {
        format!("comment.{}", self.action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialEvent {
    pub event_id: String,
    /// "follow" or "unfollow"
    pub action: String,
    pub follower_id: i64,
    pub vlogger_id: i64,
    pub occurred_at: DateTime<Utc>,
}

impl SocialEvent {
    pub fn follow(follower_id: i64, vlogger_id: i64) -> Self {
        Self::new("follow", follower_id, vlogger_id)
    }

    pub fn unfollow(follower_id: i64, vlogger_id: i64) -> Self {
        Self::new("unfollow", follower_id, vlogger_id)
    }

    fn new(action: &str, follower_id: i64, vlogger_id: i64) -> Self {
        Self {
            event_id: new_event_id(),
            action: action.to_string(),
            follower_id,
            vlogger_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn routing_key(&self) -> String {
        format!("social.{}", self.action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularityEvent {
    pub event_id: String,
    pub video_id: i64,
    pub change: i64,
    pub occurred_at: DateTime<Utc>,
}

impl PopularityEvent {
    pub fn update(video_id: i64, change: i64) -> Self {
        Self {
            event_id: new_event_id(),
            video_id,
            change,
            occurred_at: Utc::now(),
        }
    }

    pub fn routing_key(&self) -> &'static str {
        "video.popularity.update"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ids_are_128_bit_hex() {
        let id = new_event_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn like_event_shape() {
        let evt = LikeEvent::like(3, 7);
        assert_eq!(evt.action, "like");
        assert_eq!(evt.routing_key(), "like.like");

        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["user_id"], 3);
        assert_eq!(json["video_id"], 7);
        assert!(json["event_id"].is_string());
        assert!(json["occurred_at"].is_string());
    }

    #[test]
    fn comment_delete_omits_publish_fields() {
        let evt = CommentEvent::delete(11);
        assert_eq!(evt.routing_key(), "comment.delete");
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["comment_id"], 11);
        assert!(json.get("video_id").is_none());
        assert!(json.get("content").is_none());
    }

    #[test]
    fn topics_match_domains() {
        assert_eq!(EventTopic::Like.topic(), "like.events");
        assert_eq!(EventTopic::Popularity.topic(), "video.popularity.events");
        assert_eq!(
            SocialEvent::unfollow(1, 2).routing_key(),
            "social.unfollow"
        );
        assert_eq!(PopularityEvent::update(1, -1).routing_key(), "video.popularity.update");
    }

    #[test]
    fn events_round_trip() {
        let evt = SocialEvent::follow(5, 9);
        let bytes = serde_json::to_vec(&evt).unwrap();
        let back: SocialEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.follower_id, 5);
        assert_eq!(back.vlogger_id, 9);
        assert_eq!(back.event_id, evt.event_id);
    }
}
