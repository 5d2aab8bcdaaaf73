use crate::models::Video;
use sqlx::PgPool;
use std::collections::HashSet;

#[derive(Clone)]
pub struct LikeRepository {
    pool: PgPool,
}

impl LikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a like row; the unique constraint turns a duplicate into a
    /// no-op. Returns whether a new row was created, which is what gates the
    /// counter bump.
    pub async fn create_ignore_duplicate(
        &self,
        video_id: i64,
        account_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO likes (video_id, account_id)
            VALUES ($1, $2)
            ON CONFLICT (video_id, account_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(video_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted.is_some())
    }

    /// Returns whether a row was actually removed.
    pub async fn delete(&self, video_id: i64, account_id: i64) -> Result<bool, sqlx::Error> {
        let affected = sqlx::query("DELETE FROM likes WHERE video_id = $1 AND account_id = $2")
            .bind(video_id)
            .bind(account_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    pub async fn is_liked(&self, video_id: i64, account_id: i64) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE video_id = $1 AND account_id = $2)",
        )
        .bind(video_id)
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// One query for a whole feed page. Anonymous viewers skip the call and
    /// get `is_liked = false` everywhere.
    pub async fn batch_get_liked(
        &self,
        video_ids: &[i64],
        account_id: i64,
    ) -> Result<HashSet<i64>, sqlx::Error> {
        if video_ids.is_empty() || account_id == 0 {
            return Ok(HashSet::new());
        }
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT video_id FROM likes WHERE video_id = ANY($1) AND account_id = $2",
        )
        .bind(video_ids)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Videos the account liked, most recent like first.
    pub async fn list_liked_videos(&self, account_id: i64) -> Result<Vec<Video>, sqlx::Error> {
        sqlx::query_as::<_, Video>(
            r#"
            SELECT v.id, v.author_id, v.author_username, v.title, v.description,
                   v.play_url, v.cover_url, v.create_time, v.likes_count, v.popularity
            FROM videos v
            JOIN likes l ON l.video_id = v.id
            WHERE l.account_id = $1
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
    }
}
