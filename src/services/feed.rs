//! The four ranked listings.
//!
//! Latest and following are cache-aside behind a rebuild lease (entry TTL 5s,
//! lease TTL 500ms). Likes-ranked is never cached: its sort key mutates
//! constantly and the composite cursor is cheap on the index. Popularity
//! pages over a short-lived snapshot materialized from the last 60 minute
//! buckets, with a triple-cursor database fallback when the cache is
//! unreachable.

use crate::cache::{cached_or_build, keys, CacheClient};
use crate::error::AppResult;
use crate::models::Video;
use crate::repository::feed::{FeedRepository, LikesCursor, PopularityCursor};
use crate::repository::likes::LikeRepository;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const FEED_TTL: Duration = Duration::from_secs(5);
const FEED_LEASE_TTL: Duration = Duration::from_millis(500);
const MERGE_TTL: Duration = Duration::from_secs(2 * 60);
/// Number of minute buckets folded into a popularity snapshot.
const HOT_WINDOW_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedAuthor {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedVideoItem {
    pub id: i64,
    pub author: FeedAuthor,
    pub title: String,
    pub description: String,
    pub play_url: String,
    pub cover_url: String,
    pub create_time: i64,
    pub likes_count: i64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLatestResponse {
    pub video_list: Vec<FeedVideoItem>,
    pub next_time: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLikesCountResponse {
    pub video_list: Vec<FeedVideoItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_likes_count_before: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_id_before: Option<i64>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListByFollowingResponse {
    pub video_list: Vec<FeedVideoItem>,
    pub next_time: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListByPopularityResponse {
    pub video_list: Vec<FeedVideoItem>,
    /// Snapshot minute this page was served from; echo it back for the next
    /// page so pagination stays on one snapshot. 0 on the DB fallback path.
    pub as_of: i64,
    pub next_offset: i64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_latest_popularity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_latest_before: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_latest_id_before: Option<i64>,
}

/// Snapshot minute: the request's `as_of` when set, otherwise the current
/// minute, both floored.
pub fn resolve_as_of(req_as_of: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    if req_as_of > 0 {
        if let Some(t) = Utc.timestamp_opt(req_as_of, 0).single() {
            return keys::minute_floor(t);
        }
    }
    keys::minute_floor(now)
}

/// The 60 minute-bucket keys ending at `as_of`, newest first.
pub fn hot_window_keys(as_of: DateTime<Utc>) -> Vec<String> {
    (0..HOT_WINDOW_MINUTES)
        .map(|k| keys::hot_bucket(as_of - ChronoDuration::minutes(k)))
        .collect()
}

/// Reorder a batch-loaded page to match the snapshot's member order,
/// dropping ids whose rows vanished between the snapshot and the load.
pub fn order_by_members(members: &[String], videos: Vec<Video>) -> Vec<Video> {
    let mut by_id: HashMap<i64, Video> = videos.into_iter().map(|v| (v.id, v)).collect();
    members
        .iter()
        .filter_map(|m| m.parse::<i64>().ok())
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

#[derive(Clone)]
pub struct FeedService {
    repo: FeedRepository,
    likes: LikeRepository,
    cache: Option<CacheClient>,
}

impl FeedService {
    pub fn new(repo: FeedRepository, likes: LikeRepository, cache: Option<CacheClient>) -> Self {
        Self { repo, likes, cache }
    }

    /// Chronological feed. Cached only for anonymous viewers: the key
    /// carries no identity and neither does the enrichment (is_liked is
    /// uniformly false without a viewer).
    pub async fn list_latest(
        &self,
        limit: i64,
        latest_before: i64,
        viewer_id: i64,
    ) -> AppResult<ListLatestResponse> {
        let before = parse_before(latest_before);

        let build = || async move {
            let videos = self.repo.list_latest(limit, before).await?;
            let next_time = videos.last().map(|v| v.create_time.timestamp()).unwrap_or(0);
            let has_more = videos.len() as i64 == limit;
            let video_list = self.build_items(&videos, viewer_id).await?;
            Ok(ListLatestResponse {
                video_list,
                next_time,
                has_more,
            })
        };

        match &self.cache {
            Some(cache) if viewer_id == 0 => {
                let key = keys::feed_latest(limit, latest_before.max(0));
                cached_or_build(cache, &key, FEED_TTL, FEED_LEASE_TTL, build).await
            }
            _ => build().await,
        }
    }

    /// Likes-ranked feed, composite cursor, never cached.
    pub async fn list_likes_count(
        &self,
        limit: i64,
        cursor: Option<LikesCursor>,
        viewer_id: i64,
    ) -> AppResult<ListLikesCountResponse> {
        let videos = self.repo.list_likes_count(limit, cursor).await?;
        let has_more = videos.len() as i64 == limit;
        let next = videos.last().map(|v| (v.likes_count, v.id));
        let video_list = self.build_items(&videos, viewer_id).await?;
        Ok(ListLikesCountResponse {
            video_list,
            next_likes_count_before: next.map(|(likes, _)| likes),
            next_id_before: next.map(|(_, id)| id),
            has_more,
        })
    }

    /// Following feed. Cached only for logged-in viewers; the key embeds the
    /// viewer so no identity bleeds across sessions.
    pub async fn list_by_following(
        &self,
        limit: i64,
        latest_before: i64,
        viewer_id: i64,
    ) -> AppResult<ListByFollowingResponse> {
        let before = parse_before(latest_before);

        let build = || async move {
            let videos = self.repo.list_by_following(limit, viewer_id, before).await?;
            let next_time = videos.last().map(|v| v.create_time.timestamp()).unwrap_or(0);
            let has_more = videos.len() as i64 == limit;
            let video_list = self.build_items(&videos, viewer_id).await?;
            Ok(ListByFollowingResponse {
                video_list,
                next_time,
                has_more,
            })
        };

        match &self.cache {
            Some(cache) if viewer_id != 0 => {
                let key = keys::feed_following(limit, viewer_id, latest_before.max(0));
                cached_or_build(cache, &key, FEED_TTL, FEED_LEASE_TTL, build).await
            }
            _ => build().await,
        }
    }

    /// Popularity feed over a materialized snapshot, with offset paging.
    /// Sequential pages that echo the returned `as_of` observe one snapshot
    /// for its 2-minute lifetime regardless of concurrent bucket writes.
    pub async fn list_by_popularity(
        &self,
        limit: i64,
        req_as_of: i64,
        offset: i64,
        viewer_id: i64,
        db_cursor: Option<PopularityCursor>,
    ) -> AppResult<ListByPopularityResponse> {
        if let Some(cache) = &self.cache {
            let as_of = resolve_as_of(req_as_of, Utc::now());

            if let Some(resp) = self
                .try_snapshot_page(cache, as_of, limit, offset, viewer_id)
                .await?
            {
                return Ok(resp);
            }
        }

        // Cache unreachable or window empty on the first page: serve from
        // the ranking repository with the client-supplied triple cursor.
        let videos = self.repo.list_by_popularity(limit, db_cursor).await?;
        let has_more = videos.len() as i64 == limit;
        let next = next_popularity_cursor(&videos);
        let video_list = self.build_items(&videos, viewer_id).await?;
        Ok(ListByPopularityResponse {
            video_list,
            as_of: 0,
            next_offset: 0,
            has_more,
            next_latest_popularity: next.map(|c| c.popularity),
            next_latest_before: next.map(|c| c.create_time.timestamp()),
            next_latest_id_before: next.map(|c| c.id),
        })
    }

    /// One page from the hot-window snapshot. Ok(None) means the snapshot
    /// path cannot serve this request and the caller should fall back.
    async fn try_snapshot_page(
        &self,
        cache: &CacheClient,
        as_of: DateTime<Utc>,
        limit: i64,
        offset: i64,
        viewer_id: i64,
    ) -> AppResult<Option<ListByPopularityResponse>> {
        let dest = keys::hot_merge(as_of);

        // Materialize once per snapshot minute; later pages reuse it.
        match cache.exists(&dest).await {
            Ok(false) => {
                let buckets = hot_window_keys(as_of);
                if cache.zunion_store(&dest, &buckets).await.is_err() {
                    return Ok(None);
                }
                let _ = cache.expire(&dest, MERGE_TTL).await;
            }
            Ok(true) => {}
            Err(_) => return Ok(None),
        }

        let members = match cache.zrevrange(&dest, offset, offset + limit - 1).await {
            Ok(members) => members,
            Err(_) => return Ok(None),
        };

        if members.is_empty() {
            if offset > 0 {
                // Ran off the end of the snapshot.
                return Ok(Some(ListByPopularityResponse {
                    video_list: Vec::new(),
                    as_of: as_of.timestamp(),
                    next_offset: offset,
                    has_more: false,
                    next_latest_popularity: None,
                    next_latest_before: None,
                    next_latest_id_before: None,
                }));
            }
            // Empty window on the first page: let the DB rank instead.
            return Ok(None);
        }

        let ids: Vec<i64> = members
            .iter()
            .filter_map(|m| m.parse::<i64>().ok())
            .filter(|id| *id > 0)
            .collect();
        let videos = self.repo.get_by_ids(&ids).await?;
        let ordered = order_by_members(&members, videos);

        let next = next_popularity_cursor(&ordered);
        let video_list = self.build_items(&ordered, viewer_id).await?;
        let page_len = video_list.len() as i64;
        Ok(Some(ListByPopularityResponse {
            video_list,
            as_of: as_of.timestamp(),
            next_offset: offset + page_len,
            has_more: page_len == limit,
            next_latest_popularity: next.map(|c| c.popularity),
            next_latest_before: next.map(|c| c.create_time.timestamp()),
            next_latest_id_before: next.map(|c| c.id),
        }))
    }

    /// One batched query fills is_liked for the whole page; anonymous
    /// viewers skip the query entirely.
    async fn build_items(&self, videos: &[Video], viewer_id: i64) -> AppResult<Vec<FeedVideoItem>> {
        let ids: Vec<i64> = videos.iter().map(|v| v.id).collect();
        let liked = self.likes.batch_get_liked(&ids, viewer_id).await?;

        Ok(videos
            .iter()
            .map(|v| FeedVideoItem {
                id: v.id,
                author: FeedAuthor {
                    id: v.author_id,
                    username: v.author_username.clone(),
                },
                title: v.title.clone(),
                description: v.description.clone(),
                play_url: v.play_url.clone(),
                cover_url: v.cover_url.clone(),
                create_time: v.create_time.timestamp(),
                likes_count: v.likes_count,
                is_liked: liked.contains(&v.id),
            })
            .collect())
    }
}

fn parse_before(unix: i64) -> Option<DateTime<Utc>> {
    if unix > 0 {
        Utc.timestamp_opt(unix, 0).single()
    } else {
        None
    }
}

/// Fallback cursor derived from the page's last row, so clients can continue
/// seamlessly through the repository if the snapshot later disappears.
fn next_popularity_cursor(videos: &[Video]) -> Option<PopularityCursor> {
    videos.last().map(|v| PopularityCursor {
        popularity: v.popularity,
        create_time: v.create_time,
        id: v.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn video(id: i64, popularity: i64) -> Video {
        Video {
            id,
            author_id: 1,
            author_username: "a".into(),
            title: "t".into(),
            description: String::new(),
            play_url: "p".into(),
            cover_url: "c".into(),
            create_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            likes_count: 0,
            popularity,
        }
    }

    #[test]
    fn window_has_sixty_contiguous_buckets() {
        let as_of = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();
        let window = hot_window_keys(as_of);
        assert_eq!(window.len(), 60);
        assert_eq!(window[0], "hot:video:1m:202401011500");
        assert_eq!(window[1], "hot:video:1m:202401011459");
        assert_eq!(window[59], "hot:video:1m:202401011401");
    }

    #[test]
    fn window_crosses_day_boundaries() {
        let as_of = Utc.with_ymd_and_hms(2024, 3, 1, 0, 5, 0).unwrap();
        let window = hot_window_keys(as_of);
        assert_eq!(window[5], "hot:video:1m:202403010000");
        assert_eq!(window[6], "hot:video:1m:202402292359");
    }

    #[test]
    fn as_of_prefers_request_value() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 45).unwrap();
        let requested = Utc.with_ymd_and_hms(2024, 1, 2, 10, 7, 31).unwrap();
        assert_eq!(
            resolve_as_of(requested.timestamp(), now),
            Utc.with_ymd_and_hms(2024, 1, 2, 10, 7, 0).unwrap()
        );
        assert_eq!(
            resolve_as_of(0, now),
            Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn batch_load_is_reordered_to_member_order() {
        let members = vec!["3".to_string(), "1".to_string(), "2".to_string()];
        let loaded = vec![video(1, 10), video(2, 20), video(3, 30)];
        let ordered = order_by_members(&members, loaded);
        let ids: Vec<i64> = ordered.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn vanished_rows_and_bad_members_are_dropped() {
        let members = vec!["9".to_string(), "x".to_string(), "2".to_string()];
        let loaded = vec![video(2, 20)];
        let ordered = order_by_members(&members, loaded);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id, 2);
    }

    #[test]
    fn popularity_cursor_comes_from_last_row() {
        let videos = vec![video(5, 50), video(4, 40)];
        let cursor = next_popularity_cursor(&videos).unwrap();
        assert_eq!(cursor.id, 4);
        assert_eq!(cursor.popularity, 40);
        assert!(next_popularity_cursor(&[]).is_none());
    }
}
