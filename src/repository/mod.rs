//! PostgreSQL access, one module per table group.
//!
//! Functions take a pool, or a connection when they run inside a caller's
//! transaction, and return rows as plain models.

pub mod comments;
pub mod likes;
pub mod photos;
pub mod tags;
pub mod users;

/// True when a statement failed on a unique constraint
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
