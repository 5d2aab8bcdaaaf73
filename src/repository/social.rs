use crate::models::Account;
use sqlx::PgPool;

#[derive(Clone)]
pub struct SocialRepository {
    pool: PgPool,
}

impl SocialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the follow edge; the pair constraint turns a duplicate into a
    /// no-op. Returns whether a new edge was created.
    pub async fn follow(&self, follower_id: i64, vlogger_id: i64) -> Result<bool, sqlx::Error> {
        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO follows (follower_id, vlogger_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, vlogger_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(follower_id)
        .bind(vlogger_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted.is_some())
    }

    pub async fn unfollow(&self, follower_id: i64, vlogger_id: i64) -> Result<bool, sqlx::Error> {
        let affected =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND vlogger_id = $2")
                .bind(follower_id)
                .bind(vlogger_id)
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok(affected > 0)
    }

    pub async fn is_followed(&self, follower_id: i64, vlogger_id: i64) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND vlogger_id = $2)",
        )
        .bind(follower_id)
        .bind(vlogger_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Accounts following the given vlogger.
    pub async fn followers_of(&self, vlogger_id: i64) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT a.id, a.username, a.password_hash, a.token
            FROM accounts a
            JOIN follows f ON f.follower_id = a.id
            WHERE f.vlogger_id = $1
            "#,
        )
        .bind(vlogger_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Accounts the given follower is following.
    pub async fn vloggers_of(&self, follower_id: i64) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT a.id, a.username, a.password_hash, a.token
            FROM accounts a
            JOIN follows f ON f.vlogger_id = a.id
            WHERE f.follower_id = $1
            "#,
        )
        .bind(follower_id)
        .fetch_all(&self.pool)
        .await
    }
}
