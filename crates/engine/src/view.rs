use common::{BillOfMaterials, Price, Product, ProductId};
use serde::Serialize;

use crate::availability::{StockLookup, compute_sellable_quantity};

/// A catalog product together with how many units stock can assemble now.
///
/// Computed on demand; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellableView {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub bill_of_materials: BillOfMaterials,
    pub sellable_quantity: u64,
}

impl SellableView {
    /// Builds the view of a product against the given stock levels.
    pub fn compute(product: Product, stock: &impl StockLookup) -> Self {
        let sellable_quantity = compute_sellable_quantity(&product.bill_of_materials, stock);
        Self {
            product_id: product.id,
            name: product.name,
            price: product.price,
            bill_of_materials: product.bill_of_materials,
            sellable_quantity,
        }
    }

    /// Returns true if at least one unit can be sold.
    pub fn is_available(&self) -> bool {
        self.sellable_quantity > 0
    }
}
