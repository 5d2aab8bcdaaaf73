use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

// Embed SQL migrations at compile time for deterministic startup
const MIG_0001: &str = include_str!("../migrations/0001_create_accounts.sql");
const MIG_0002: &str = include_str!("../migrations/0002_create_videos.sql");
const MIG_0003: &str = include_str!("../migrations/0003_create_likes.sql");
const MIG_0004: &str = include_str!("../migrations/0004_create_comments.sql");
const MIG_0005: &str = include_str!("../migrations/0005_create_follows.sql");

pub async fn init_pool(database_url: &str) -> Result<Pool<Postgres>, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Apply embedded migrations sequentially. Safe to call on every startup:
/// each statement is IF NOT EXISTS and a global advisory lock serializes
/// concurrent deployments against the same database.
pub async fn run_migrations(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    let _ = sqlx::query("SELECT pg_advisory_lock(727156)").execute(db).await;

    let migrations = [MIG_0001, MIG_0002, MIG_0003, MIG_0004, MIG_0005];
    for (i, sql) in migrations.into_iter().enumerate() {
        let label = i + 1;
        // Migration files may contain multiple statements
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            match sqlx::query(statement).execute(db).await {
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(migration = %label, error = %e, "migration statement skipped");
                }
            }
        }
        tracing::info!(migration = %label, "migration applied");
    }

    let _ = sqlx::query("SELECT pg_advisory_unlock(727156)").execute(db).await;
    Ok(())
}
