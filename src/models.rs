use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account row. `token` holds the single active session token; an empty
/// string means logged out. Never serialized to clients.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub token: String,
}

/// Public projection of an account (no secrets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub id: i64,
    pub username: String,
}

impl From<&Account> for AccountView {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            username: a.username.clone(),
        }
    }
}

/// Video row. `author_username` is denormalized so read paths never join
/// against accounts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Video {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub title: String,
    pub description: String,
    pub play_url: String,
    pub cover_url: String,
    pub create_time: DateTime<Utc>,
    pub likes_count: i64,
    pub popularity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub video_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
