use crate::models::Video;
use sqlx::PgPool;

const VIDEO_COLUMNS: &str = "id, author_id, author_username, title, description, play_url, cover_url, create_time, likes_count, popularity";

#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create(
        &self,
        author_id: i64,
        author_username: &str,
        title: &str,
        description: &str,
        play_url: &str,
        cover_url: &str,
    ) -> Result<Video, sqlx::Error> {
        sqlx::query_as::<_, Video>(&format!(
            r#"
            INSERT INTO videos (author_id, author_username, title, description, play_url, cover_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {VIDEO_COLUMNS}
            "#
        ))
        .bind(author_id)
        .bind(author_username)
        .bind(title)
        .bind(description)
        .bind(play_url)
        .bind(cover_url)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Video>, sqlx::Error> {
        sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn is_exist(&self, id: i64) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM videos WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<Video>, sqlx::Error> {
        sqlx::query_as::<_, Video>(&format!(
            r#"
            SELECT {VIDEO_COLUMNS} FROM videos
            WHERE author_id = $1
            ORDER BY create_time DESC
            "#
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Increment the likes counter, clamped at zero so out-of-order unlike
    /// events can never drive it negative.
    pub async fn change_likes_count(&self, id: i64, delta: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE videos SET likes_count = GREATEST(likes_count + $2, 0) WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Increment the popularity aggregate, clamped at zero.
    pub async fn change_popularity(&self, id: i64, delta: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE videos SET popularity = GREATEST(popularity + $2, 0) WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Set the counter to an exact value. Reconciliation only.
    pub async fn update_likes_count(&self, id: i64, likes_count: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE videos SET likes_count = $2 WHERE id = $1")
            .bind(id)
            .bind(likes_count)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
