//! Persisted records: articles held in the stock ledger and products held in
//! the catalog.

use serde::{Deserialize, Serialize};

use crate::{ArticleId, BillOfMaterials, Price, ProductId};

/// A raw-material article and its current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub name: String,
    pub stock: u64,
}

impl Article {
    /// Creates a new article record.
    pub fn new(id: impl Into<ArticleId>, name: impl Into<String>, stock: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stock,
        }
    }
}

/// A sellable product assembled from articles.
///
/// The name is the natural key used when the catalog is re-uploaded; the id
/// is generated once and kept across updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub bill_of_materials: BillOfMaterials,
}

impl Product {
    /// Creates a product with a freshly generated id.
    pub fn create(name: impl Into<String>, price: Price, bill_of_materials: BillOfMaterials) -> Self {
        Self {
            id: ProductId::generate(),
            name: name.into(),
            price,
            bill_of_materials,
        }
    }

    /// Returns a copy with the price and bill of materials replaced, keeping
    /// the id and name.
    pub fn revised(&self, price: Price, bill_of_materials: BillOfMaterials) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            price,
            bill_of_materials,
        }
    }
}
