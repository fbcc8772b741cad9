//! Stock reconciliation and sale engine.
//!
//! This crate derives how many units of each product can be assembled from
//! the current article stock, and sells single units atomically:
//! - [`availability`]: pure sellable-quantity calculation
//! - [`sale`]: the sale state machine with optimistic-concurrency retry
//! - [`restock`]: merging supplier stock deltas into the ledger
//! - [`intake`]: catalog uploads keyed by product name
//! - [`inventory`]: a facade tying the above to one ledger and catalog

pub mod availability;
pub mod error;
pub mod intake;
pub mod inventory;
pub mod restock;
pub mod sale;
pub mod view;

pub use availability::{StockLookup, StockSnapshot, compute_sellable_quantity};
pub use error::{ErrorKind, IntakeError, SaleError};
pub use intake::{CatalogFailure, CatalogIntake, CatalogReport, DraftLine, ProductDraft};
pub use inventory::Inventory;
pub use restock::{RestockEntry, RestockFailure, RestockProcessor, RestockReport};
pub use sale::{Deduction, SaleConfig, SaleEngine, SaleReceipt};
pub use view::SellableView;
