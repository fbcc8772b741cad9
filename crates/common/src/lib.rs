//! Shared types for the warehouse stock engine.
//!
//! Identifiers, prices and the article/product records that the storage
//! backends persist and the engine reasons about.

pub mod bom;
pub mod model;
pub mod price;
pub mod types;

pub use bom::{BillOfMaterials, BomError, BomLine};
pub use model::{Article, Product};
pub use price::{MAX_PRICE_CENTS, Price, PriceError};
pub use types::{ArticleId, ProductId};
