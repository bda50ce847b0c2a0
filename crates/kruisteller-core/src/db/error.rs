//! Error types for the database gateway.

use thiserror::Error;

/// Gateway operation result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error (connection, query, decoding)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
