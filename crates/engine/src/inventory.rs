//! One ledger and one catalog behind the engine's operations.

use std::collections::BTreeSet;

use common::{Article, ArticleId, ProductId};
use stock_store::{ArticleLedger, ProductCatalog, StoreError};

use crate::availability::StockSnapshot;
use crate::error::SaleError;
use crate::intake::{CatalogIntake, CatalogReport, ProductDraft};
use crate::restock::{RestockEntry, RestockProcessor, RestockReport};
use crate::sale::{SaleConfig, SaleEngine, SaleReceipt};
use crate::view::SellableView;

/// Entry point for the warehouse operations.
///
/// Cheap to clone when the stores are; clones share the same stores.
#[derive(Clone)]
pub struct Inventory<L, C> {
    ledger: L,
    catalog: C,
    sales: SaleEngine<L, C>,
    restock: RestockProcessor<L>,
    intake: CatalogIntake<C>,
}

impl<L, C> Inventory<L, C>
where
    L: ArticleLedger + Clone,
    C: ProductCatalog + Clone,
{
    pub fn new(ledger: L, catalog: C) -> Self {
        Self::with_sale_config(ledger, catalog, SaleConfig::default())
    }

    pub fn with_sale_config(ledger: L, catalog: C, config: SaleConfig) -> Self {
        Self {
            sales: SaleEngine::with_config(ledger.clone(), catalog.clone(), config),
            restock: RestockProcessor::new(ledger.clone()),
            intake: CatalogIntake::new(catalog.clone()),
            ledger,
            catalog,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Sells one unit of a product.
    pub async fn sell(&self, product_id: &ProductId) -> Result<SaleReceipt, SaleError> {
        self.sales.sell(product_id).await
    }

    /// Applies an inventory delivery.
    pub async fn restock(&self, entries: Vec<RestockEntry>) -> Result<RestockReport, StoreError> {
        self.restock.apply_restock(entries).await
    }

    /// Merges product definitions into the catalog.
    pub async fn upload_products(
        &self,
        drafts: Vec<ProductDraft>,
    ) -> Result<CatalogReport, StoreError> {
        self.intake.upload(drafts).await
    }

    /// Lists every article in the ledger.
    pub async fn list_articles(&self) -> Result<Vec<Article>, StoreError> {
        self.ledger.list_all().await
    }

    /// Computes the sellable quantity of every catalog product, including
    /// those that cannot currently be assembled.
    ///
    /// All quantities are computed from a single stock read.
    #[tracing::instrument(skip(self))]
    pub async fn list_sellable(&self) -> Result<Vec<SellableView>, StoreError> {
        let products = self.catalog.list_all().await?;

        let article_ids: Vec<ArticleId> = products
            .iter()
            .flat_map(|product| product.bill_of_materials.article_ids().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let snapshot = StockSnapshot::from_articles(self.ledger.get_many(&article_ids).await?);

        Ok(products
            .into_iter()
            .map(|product| SellableView::compute(product, &snapshot))
            .collect())
    }

    /// Computes the sellable quantity of one product, or None if the catalog
    /// has no such product.
    pub async fn sellable(&self, product_id: &ProductId) -> Result<Option<SellableView>, StoreError> {
        let Some(product) = self.catalog.get_by_id(product_id).await? else {
            return Ok(None);
        };

        let article_ids: Vec<ArticleId> = product.bill_of_materials.article_ids().cloned().collect();
        let snapshot = StockSnapshot::from_articles(self.ledger.get_many(&article_ids).await?);
        Ok(Some(SellableView::compute(product, &snapshot)))
    }
}
