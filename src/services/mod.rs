pub mod account;
pub mod comment;
pub mod feed;
pub mod like;
pub mod social;
pub mod video;

/// Postgres unique-constraint violation (SQLSTATE 23505). Duplicate inserts
/// on uniquely-indexed pairs are business outcomes, not failures.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
