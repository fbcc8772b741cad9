pub mod catalog;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;

pub use catalog::ProductCatalog;
pub use common::{Article, ArticleId, BillOfMaterials, BomLine, Price, Product, ProductId};
pub use error::{Result, StoreError};
pub use ledger::{
    ArticleLedger, ArticleLedgerExt, MAX_STOCK, StockDeduction, StockWrite, WriteOutcome,
};
pub use memory::{InMemoryArticleLedger, InMemoryProductCatalog};
pub use postgres::PostgresStockStore;
