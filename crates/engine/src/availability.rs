//! Sellable-quantity calculation.

use std::collections::HashMap;

use common::{Article, ArticleId, BillOfMaterials};

/// Source of current stock levels for the calculator.
pub trait StockLookup {
    /// Returns the stock of an article, or None if the ledger has no such
    /// article.
    fn stock_of(&self, article_id: &ArticleId) -> Option<u64>;
}

impl StockLookup for HashMap<ArticleId, u64> {
    fn stock_of(&self, article_id: &ArticleId) -> Option<u64> {
        self.get(article_id).copied()
    }
}

/// Point-in-time copy of article stock levels.
///
/// Stale as soon as it is taken; writes based on it must be conditional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSnapshot {
    stock: HashMap<ArticleId, u64>,
}

impl StockSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from ledger records.
    pub fn from_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        Self {
            stock: articles
                .into_iter()
                .map(|article| (article.id, article.stock))
                .collect(),
        }
    }

    /// Records the stock of an article, replacing any earlier value.
    pub fn insert(&mut self, article_id: ArticleId, stock: u64) {
        self.stock.insert(article_id, stock);
    }

    /// Returns the number of articles in the snapshot.
    pub fn len(&self) -> usize {
        self.stock.len()
    }

    /// Returns true if the snapshot holds no articles.
    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }
}

impl StockLookup for StockSnapshot {
    fn stock_of(&self, article_id: &ArticleId) -> Option<u64> {
        self.stock.get(article_id).copied()
    }
}

/// Computes how many whole units of a product the given stock can assemble.
///
/// Each line allows `floor(stock / quantity_per_unit)` units and the product
/// is limited by its scarcest line. A line whose article is missing from the
/// ledger makes the product unassemblable, and so does an empty bill of
/// materials.
pub fn compute_sellable_quantity(bom: &BillOfMaterials, stock: &impl StockLookup) -> u64 {
    let mut sellable: Option<u64> = None;

    for line in bom {
        let Some(available) = stock.stock_of(&line.article_id) else {
            return 0;
        };
        let units = available / line.quantity_per_unit;
        sellable = Some(sellable.map_or(units, |current| current.min(units)));
    }

    sellable.unwrap_or(0)
}
