//! Ranked listing queries. Every query returns at most `limit` rows under a
//! strict total order, with cursor predicates chosen so the next page starts
//! immediately after the previous page's last row.

use crate::models::Video;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const VIDEO_COLUMNS: &str = "id, author_id, author_username, title, description, play_url, cover_url, create_time, likes_count, popularity";

/// Composite cursor for the likes-ranked listing: (likes_count DESC, id DESC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikesCursor {
    pub likes_count: i64,
    pub id: i64,
}

/// Triple cursor for the popularity DB fallback:
/// (popularity DESC, create_time DESC, id DESC).
#[derive(Debug, Clone, Copy)]
pub struct PopularityCursor {
    pub popularity: i64,
    pub create_time: DateTime<Utc>,
    pub id: i64,
}

#[derive(Clone)]
pub struct FeedRepository {
    pool: PgPool,
}

impl FeedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Order: create_time DESC. Cursor: strictly-before timestamp.
    ///
    /// Rows sharing create_time at a page boundary can be skipped or
    /// repeated; the original system shipped with this cursor and the
    /// composite (create_time, id) upgrade was deliberately not taken.
    pub async fn list_latest(
        &self,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Video>, sqlx::Error> {
        match before {
            Some(t) => {
                sqlx::query_as::<_, Video>(&format!(
                    r#"
                    SELECT {VIDEO_COLUMNS} FROM videos
                    WHERE create_time < $1
                    ORDER BY create_time DESC
                    LIMIT $2
                    "#
                ))
                .bind(t)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Video>(&format!(
                    r#"
                    SELECT {VIDEO_COLUMNS} FROM videos
                    ORDER BY create_time DESC
                    LIMIT $1
                    "#
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    /// Order: (likes_count DESC, id DESC) with the lexicographic cursor
    /// predicate, so ties on likes_count paginate without skips or repeats.
    pub async fn list_likes_count(
        &self,
        limit: i64,
        cursor: Option<LikesCursor>,
    ) -> Result<Vec<Video>, sqlx::Error> {
        match cursor {
            Some(c) => {
                sqlx::query_as::<_, Video>(&format!(
                    r#"
                    SELECT {VIDEO_COLUMNS} FROM videos
                    WHERE likes_count < $1 OR (likes_count = $1 AND id < $2)
                    ORDER BY likes_count DESC, id DESC
                    LIMIT $3
                    "#
                ))
                .bind(c.likes_count)
                .bind(c.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Video>(&format!(
                    r#"
                    SELECT {VIDEO_COLUMNS} FROM videos
                    ORDER BY likes_count DESC, id DESC
                    LIMIT $1
                    "#
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    /// Latest videos restricted to authors the viewer follows, expressed as
    /// a subquery over the follow table.
    pub async fn list_by_following(
        &self,
        limit: i64,
        viewer_id: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Video>, sqlx::Error> {
        match before {
            Some(t) => {
                sqlx::query_as::<_, Video>(&format!(
                    r#"
                    SELECT {VIDEO_COLUMNS} FROM videos
                    WHERE author_id IN (SELECT vlogger_id FROM follows WHERE follower_id = $1)
                      AND create_time < $2
                    ORDER BY create_time DESC
                    LIMIT $3
                    "#
                ))
                .bind(viewer_id)
                .bind(t)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Video>(&format!(
                    r#"
                    SELECT {VIDEO_COLUMNS} FROM videos
                    WHERE author_id IN (SELECT vlogger_id FROM follows WHERE follower_id = $1)
                    ORDER BY create_time DESC
                    LIMIT $2
                    "#
                ))
                .bind(viewer_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    /// DB fallback for the popularity feed when the hot window is
    /// unreachable. Triple cursor with the lexicographic extension of the
    /// likes-ranked predicate.
    pub async fn list_by_popularity(
        &self,
        limit: i64,
        cursor: Option<PopularityCursor>,
    ) -> Result<Vec<Video>, sqlx::Error> {
        match cursor {
            Some(c) => {
                sqlx::query_as::<_, Video>(&format!(
                    r#"
                    SELECT {VIDEO_COLUMNS} FROM videos
                    WHERE popularity < $1
                       OR (popularity = $1 AND create_time < $2)
                       OR (popularity = $1 AND create_time = $2 AND id < $3)
                    ORDER BY popularity DESC, create_time DESC, id DESC
                    LIMIT $4
                    "#
                ))
                .bind(c.popularity)
                .bind(c.create_time)
                .bind(c.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Video>(&format!(
                    r#"
                    SELECT {VIDEO_COLUMNS} FROM videos
                    ORDER BY popularity DESC, create_time DESC, id DESC
                    LIMIT $1
                    "#
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    /// Batch load by id. Row order is unspecified; callers reorder to match
    /// their member list.
    pub async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Video>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }
}
