use thiserror::Error;

use crate::ArticleId;

/// Errors that can occur when interacting with the stock store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A single compare-and-swap batch named the same article twice.
    #[error("Article {0} appears more than once in a single stock write")]
    DuplicateWrite(ArticleId),

    /// Incrementing the stock would overflow the counter.
    #[error("Stock overflow for article {article_id}: {stock} + {delta}")]
    StockOverflow {
        article_id: ArticleId,
        stock: u64,
        delta: u64,
    },

    /// A stored numeric value does not fit the domain type.
    #[error("Stored {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    /// A conditional write kept losing to concurrent writers.
    #[error("Gave up updating article {article_id} after {attempts} conflicting attempts")]
    RetryExhausted {
        article_id: ArticleId,
        attempts: u32,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn out_of_range(field: &'static str, value: impl ToString) -> Self {
        StoreError::OutOfRange {
            field,
            value: value.to_string(),
        }
    }
}

/// Result type for stock store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
