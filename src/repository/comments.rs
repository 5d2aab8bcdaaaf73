use crate::models::Comment;
use sqlx::PgPool;

#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        video_id: i64,
        author_id: i64,
        author_username: &str,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (video_id, author_id, author_username, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, video_id, author_id, author_username, content, created_at
            "#,
        )
        .bind(video_id)
        .bind(author_id)
        .bind(author_username)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let affected = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, video_id, author_id, author_username, content, created_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// All comments for a video, most recent first.
    pub async fn list_for_video(&self, video_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, video_id, author_id, author_username, content, created_at
            FROM comments
            WHERE video_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await
    }
}
