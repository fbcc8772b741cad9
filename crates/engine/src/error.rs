//! Engine error types.

use common::{ArticleId, BomError, PriceError, ProductId};
use stock_store::{MAX_STOCK, StoreError};
use thiserror::Error;

/// Broad classification of engine failures.
///
/// `NotFound`, `SoldOut` and `InvalidQuantity` follow deterministically from
/// the input; `Conflict` means contention and the caller may retry the sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    SoldOut,
    InvalidQuantity,
    Conflict,
    Storage,
}

impl ErrorKind {
    /// Returns a stable lowercase label, used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::SoldOut => "sold_out",
            ErrorKind::InvalidQuantity => "invalid_quantity",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a sale can fail.
#[derive(Debug, Error)]
pub enum SaleError {
    /// No product with this ID is in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Current stock cannot assemble a single unit.
    #[error("Product sold out: {0}")]
    ProductSoldOut(ProductId),

    /// An article required by the product disappeared from the ledger.
    #[error("Article not found: {0}")]
    ArticleNotFound(ArticleId),

    /// Concurrent stock changes kept invalidating the sale.
    #[error("Sale of product {product_id} abandoned after {attempts} conflicting attempts")]
    Conflict {
        product_id: ProductId,
        attempts: u32,
    },

    /// The stock store failed.
    #[error("Stock store error: {0}")]
    Store(#[from] StoreError),
}

impl SaleError {
    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SaleError::ProductNotFound(_) | SaleError::ArticleNotFound(_) => ErrorKind::NotFound,
            SaleError::ProductSoldOut(_) => ErrorKind::SoldOut,
            SaleError::Conflict { .. } => ErrorKind::Conflict,
            SaleError::Store(_) => ErrorKind::Storage,
        }
    }
}

/// Reasons an intake entry (restock line or catalog product) is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntakeError {
    /// The quantity was not a valid non-negative (or, for bills of
    /// materials, positive) integer.
    #[error("Invalid quantity: {0:?}")]
    InvalidQuantity(String),

    /// The product price was negative or not a number.
    #[error("Invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    /// The product name was blank.
    #[error("Product name is empty")]
    EmptyName,

    /// The bill of materials failed validation.
    #[error("Invalid bill of materials: {0}")]
    Bom(#[from] BomError),

    /// Applying the entry would push the stored stock past its limit.
    #[error("Stock limit exceeded: {0}")]
    StockLimit(String),
}

impl IntakeError {
    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidQuantity
    }
}

/// Parses a stock quantity as a non-negative integer no larger than
/// [`MAX_STOCK`].
pub(crate) fn parse_quantity(raw: &str) -> Result<u64, IntakeError> {
    raw.parse::<u64>()
        .ok()
        .filter(|n| *n <= MAX_STOCK)
        .ok_or_else(|| IntakeError::InvalidQuantity(raw.to_string()))
}

/// Parses a per-unit quantity, which must also be positive.
pub(crate) fn parse_positive_quantity(raw: &str) -> Result<u64, IntakeError> {
    match parse_quantity(raw)? {
        0 => Err(IntakeError::InvalidQuantity(raw.to_string())),
        n => Ok(n),
    }
}
