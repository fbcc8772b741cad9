use async_trait::async_trait;

use crate::{BillOfMaterials, Price, Product, ProductId, Result};

/// Storage for catalog products.
///
/// Products are keyed by a generated ID and additionally unique by name.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Gets a product by ID.
    async fn get_by_id(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Gets a product by its unique name.
    async fn get_by_name(&self, name: &str) -> Result<Option<Product>>;

    /// Lists every product, ordered by name.
    async fn list_all(&self) -> Result<Vec<Product>>;

    /// Replaces the price and bill of materials of the product called `name`,
    /// or inserts it with a fresh ID if no such product exists.
    ///
    /// Returns the stored product.
    async fn upsert_by_name(
        &self,
        name: &str,
        price: Price,
        bill_of_materials: BillOfMaterials,
    ) -> Result<Product>;
}
