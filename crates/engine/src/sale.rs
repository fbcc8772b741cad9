//! Single-unit sales with optimistic concurrency.
//!
//! A sale moves through `ProductLookup → AvailabilityCheck → Deducting →
//! Committed`, failing out of any state. Deducting applies every bill of
//! materials line in one atomic conditional batch: either all articles are
//! decremented or none are. When a concurrent sale or restock changed an
//! article since the snapshot, the batch is rejected as a whole, stock is
//! re-read and availability re-checked before trying again.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use common::{ArticleId, BillOfMaterials, Product, ProductId};
use serde::Serialize;
use stock_store::{ArticleLedger, ArticleLedgerExt, ProductCatalog, StockDeduction, WriteOutcome};

use crate::availability::{StockLookup, StockSnapshot, compute_sellable_quantity};
use crate::error::SaleError;

/// Retry policy for sales that lose a race on stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleConfig {
    /// Deduction attempts before giving up with [`SaleError::Conflict`].
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl SaleConfig {
    /// Creates a retry policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }
}

impl Default for SaleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(10),
        }
    }
}

/// Stock removed from one article by a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deduction {
    pub article_id: ArticleId,
    pub quantity: u64,
    pub remaining: u64,
}

/// Record of a committed sale.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub product_id: ProductId,
    pub product_name: String,
    /// One entry per bill of materials line, in line order.
    pub deductions: Vec<Deduction>,
    /// Deduction attempts it took, including the successful one.
    pub attempts: u32,
    pub sold_at: DateTime<Utc>,
}

/// Sells products one unit at a time against an article ledger.
///
/// Holds no state of its own; every read is treated as possibly stale by the
/// time the write lands.
#[derive(Clone)]
pub struct SaleEngine<L, C> {
    ledger: L,
    catalog: C,
    config: SaleConfig,
}

impl<L, C> SaleEngine<L, C>
where
    L: ArticleLedger,
    C: ProductCatalog,
{
    /// Creates a sale engine with the default retry policy.
    pub fn new(ledger: L, catalog: C) -> Self {
        Self::with_config(ledger, catalog, SaleConfig::default())
    }

    /// Creates a sale engine with a custom retry policy.
    pub fn with_config(ledger: L, catalog: C, config: SaleConfig) -> Self {
        Self {
            ledger,
            catalog,
            config,
        }
    }

    /// Returns the retry policy.
    pub fn config(&self) -> &SaleConfig {
        &self.config
    }

    /// Sells one unit of a product, deducting its bill of materials from
    /// stock.
    #[tracing::instrument(skip(self))]
    pub async fn sell(&self, product_id: &ProductId) -> Result<SaleReceipt, SaleError> {
        let started = Instant::now();

        let result = self.run_sale(product_id).await;

        let outcome = match &result {
            Ok(_) => "committed",
            Err(e) => e.kind().as_str(),
        };
        metrics::counter!("sales_total", "outcome" => outcome).increment(1);
        metrics::histogram!("sale_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(receipt) => {
                tracing::info!(attempts = receipt.attempts, "product sold");
            }
            Err(SaleError::Store(e)) => {
                tracing::error!(error = %e, "sale failed on stock store");
            }
            Err(e) => {
                tracing::warn!(error = %e, "sale rejected");
            }
        }

        result
    }

    async fn run_sale(&self, product_id: &ProductId) -> Result<SaleReceipt, SaleError> {
        // ProductLookup
        let product = self
            .catalog
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| SaleError::ProductNotFound(product_id.clone()))?;
        let bom = &product.bill_of_materials;

        let mut snapshot = self.snapshot(bom).await?;
        let mut attempt = 1;

        loop {
            // AvailabilityCheck
            let sellable = compute_sellable_quantity(bom, &snapshot);
            if sellable == 0 {
                return Err(SaleError::ProductSoldOut(product_id.clone()));
            }
            if attempt > self.config.max_attempts {
                return Err(SaleError::Conflict {
                    product_id: product_id.clone(),
                    attempts: self.config.max_attempts,
                });
            }

            // Deducting
            let deductions = plan_deductions(bom, &snapshot)
                .ok_or_else(|| SaleError::ProductSoldOut(product_id.clone()))?;

            match self.ledger.try_decrement_all(&deductions).await? {
                WriteOutcome::Applied => {
                    return Ok(receipt(&product, &deductions, attempt));
                }
                WriteOutcome::NotFound(article_id) => {
                    return Err(SaleError::ArticleNotFound(article_id));
                }
                WriteOutcome::Conflict {
                    article_id,
                    expected,
                    actual,
                } => {
                    metrics::counter!("sale_conflicts_total").increment(1);
                    tracing::debug!(
                        %article_id,
                        expected,
                        actual,
                        attempt,
                        sellable,
                        "stock changed since snapshot, re-checking"
                    );

                    let fresh = self.snapshot(bom).await?;
                    if let Some(missing) = vanished_article(bom, &snapshot, &fresh) {
                        return Err(SaleError::ArticleNotFound(missing.clone()));
                    }
                    snapshot = fresh;

                    attempt += 1;
                    if attempt <= self.config.max_attempts && !self.config.retry_delay.is_zero() {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }
    }

    async fn snapshot(&self, bom: &BillOfMaterials) -> Result<StockSnapshot, SaleError> {
        let ids: Vec<ArticleId> = bom.article_ids().cloned().collect();
        let articles = self.ledger.get_many(&ids).await?;
        Ok(StockSnapshot::from_articles(articles))
    }
}

/// Builds one conditional deduction per line, expecting the snapshot values.
///
/// Returns None if an article is missing from the snapshot.
fn plan_deductions(bom: &BillOfMaterials, snapshot: &StockSnapshot) -> Option<Vec<StockDeduction>> {
    bom.lines()
        .iter()
        .map(|line| {
            snapshot.stock_of(&line.article_id).map(|expected| {
                StockDeduction::new(line.article_id.clone(), line.quantity_per_unit, expected)
            })
        })
        .collect()
}

/// Returns the first article that was in `before` but is gone from `after`.
fn vanished_article<'a>(
    bom: &'a BillOfMaterials,
    before: &StockSnapshot,
    after: &StockSnapshot,
) -> Option<&'a ArticleId> {
    bom.article_ids()
        .find(|id| before.stock_of(id).is_some() && after.stock_of(id).is_none())
}

fn receipt(product: &Product, deductions: &[StockDeduction], attempts: u32) -> SaleReceipt {
    SaleReceipt {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        deductions: deductions
            .iter()
            .map(|d| Deduction {
                article_id: d.article_id.clone(),
                quantity: d.amount,
                remaining: d.expected - d.amount,
            })
            .collect(),
        attempts,
        sold_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use common::{Article, BomLine, Price};
    use stock_store::{
        InMemoryArticleLedger, InMemoryProductCatalog, StockWrite, StoreError,
    };

    use super::*;

    fn bom(lines: &[(&str, u64)]) -> BillOfMaterials {
        BillOfMaterials::new(lines.iter().map(|(id, q)| BomLine::new(*id, *q)).collect()).unwrap()
    }

    async fn setup(
        articles: &[(&str, u64)],
        lines: &[(&str, u64)],
    ) -> (InMemoryArticleLedger, InMemoryProductCatalog, ProductId) {
        let ledger = InMemoryArticleLedger::with_articles(
            articles
                .iter()
                .map(|(id, stock)| Article::new(*id, format!("part {id}"), *stock)),
        );
        let catalog = InMemoryProductCatalog::new();
        let product = catalog
            .upsert_by_name("Chair", Price::from_cents(1000), bom(lines))
            .await
            .unwrap();
        (ledger, catalog, product.id)
    }

    async fn stock(ledger: &InMemoryArticleLedger, id: &str) -> u64 {
        ledger
            .get(&ArticleId::new(id))
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[tokio::test]
    async fn sell_deducts_each_line_once() {
        let (ledger, catalog, product_id) =
            setup(&[("A1", 10), ("A2", 6), ("A3", 4)], &[("A1", 5), ("A2", 3)]).await;
        let engine = SaleEngine::new(ledger.clone(), catalog);

        let receipt = engine.sell(&product_id).await.unwrap();

        assert_eq!(receipt.product_id, product_id);
        assert_eq!(receipt.attempts, 1);
        assert_eq!(
            receipt.deductions,
            vec![
                Deduction {
                    article_id: ArticleId::new("A1"),
                    quantity: 5,
                    remaining: 5
                },
                Deduction {
                    article_id: ArticleId::new("A2"),
                    quantity: 3,
                    remaining: 3
                },
            ]
        );
        assert_eq!(stock(&ledger, "A1").await, 5);
        assert_eq!(stock(&ledger, "A2").await, 3);
        // Untouched article
        assert_eq!(stock(&ledger, "A3").await, 4);
    }

    #[tokio::test]
    async fn sell_unknown_product() {
        let (ledger, catalog, _) = setup(&[("A1", 10)], &[("A1", 1)]).await;
        let engine = SaleEngine::new(ledger, catalog);

        let result = engine.sell(&ProductId::new("missing-id")).await;
        assert!(matches!(result, Err(SaleError::ProductNotFound(id)) if id.as_str() == "missing-id"));
    }

    #[tokio::test]
    async fn sell_sold_out_leaves_stock_alone() {
        let (ledger, catalog, product_id) =
            setup(&[("A1", 10), ("A2", 2)], &[("A1", 5), ("A2", 3)]).await;
        let engine = SaleEngine::new(ledger.clone(), catalog);

        let result = engine.sell(&product_id).await;
        assert!(matches!(result, Err(SaleError::ProductSoldOut(_))));
        assert_eq!(stock(&ledger, "A1").await, 10);
        assert_eq!(stock(&ledger, "A2").await, 2);
    }

    #[tokio::test]
    async fn sell_with_untracked_article_is_sold_out() {
        let (ledger, catalog, product_id) = setup(&[("A1", 10)], &[("A1", 1), ("A9", 1)]).await;
        let engine = SaleEngine::new(ledger.clone(), catalog);

        let result = engine.sell(&product_id).await;
        assert!(matches!(result, Err(SaleError::ProductSoldOut(_))));
        assert_eq!(stock(&ledger, "A1").await, 10);
    }

    #[tokio::test]
    async fn sell_until_exhausted() {
        let (ledger, catalog, product_id) =
            setup(&[("A1", 10), ("A2", 6)], &[("A1", 5), ("A2", 3)]).await;
        let engine = SaleEngine::new(ledger.clone(), catalog);

        engine.sell(&product_id).await.unwrap();
        engine.sell(&product_id).await.unwrap();
        let third = engine.sell(&product_id).await;

        assert!(matches!(third, Err(SaleError::ProductSoldOut(_))));
        assert_eq!(stock(&ledger, "A1").await, 0);
        assert_eq!(stock(&ledger, "A2").await, 0);
    }

    /// Ledger wrapper that lets a test interfere between snapshot and write.
    #[derive(Clone)]
    struct RacingLedger {
        inner: InMemoryArticleLedger,
        races_left: Arc<AtomicU32>,
        race: Arc<dyn Fn(&InMemoryArticleLedger) -> Vec<StockWrite> + Send + Sync>,
        removed: Option<ArticleId>,
    }

    impl RacingLedger {
        fn new(
            inner: InMemoryArticleLedger,
            races: u32,
            race: impl Fn(&InMemoryArticleLedger) -> Vec<StockWrite> + Send + Sync + 'static,
        ) -> Self {
            Self {
                inner,
                races_left: Arc::new(AtomicU32::new(races)),
                race: Arc::new(race),
                removed: None,
            }
        }
    }

    #[async_trait]
    impl ArticleLedger for RacingLedger {
        async fn get(&self, article_id: &ArticleId) -> stock_store::Result<Option<Article>> {
            self.inner.get(article_id).await
        }

        async fn get_many(&self, article_ids: &[ArticleId]) -> stock_store::Result<Vec<Article>> {
            self.inner.get_many(article_ids).await
        }

        async fn list_all(&self) -> stock_store::Result<Vec<Article>> {
            self.inner.list_all().await
        }

        async fn insert_if_absent(&self, article: Article) -> stock_store::Result<bool> {
            self.inner.insert_if_absent(article).await
        }

        async fn compare_and_swap(
            &self,
            writes: Vec<StockWrite>,
        ) -> stock_store::Result<WriteOutcome> {
            let race = self
                .races_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if race {
                let interfering = (self.race)(&self.inner);
                if !interfering.is_empty() {
                    let outcome = self.inner.compare_and_swap(interfering).await?;
                    if !outcome.is_applied() {
                        return Err(StoreError::DuplicateWrite(ArticleId::new("race-setup")));
                    }
                }
                if let Some(id) = &self.removed {
                    self.inner.remove(id).await;
                }
            }
            self.inner.compare_and_swap(writes).await
        }
    }

    #[tokio::test]
    async fn conflict_is_retried_with_fresh_stock() {
        let (inner, catalog, product_id) =
            setup(&[("A1", 10), ("A2", 6)], &[("A1", 5), ("A2", 3)]).await;
        // A restock of A2 lands between our snapshot and our write
        let ledger = RacingLedger::new(inner.clone(), 1, |_| vec![StockWrite::new("A2", 6, 9)]);
        let engine = SaleEngine::with_config(
            ledger,
            catalog,
            SaleConfig::new(5, Duration::ZERO),
        );

        let receipt = engine.sell(&product_id).await.unwrap();

        assert_eq!(receipt.attempts, 2);
        assert_eq!(stock(&inner, "A1").await, 5);
        assert_eq!(stock(&inner, "A2").await, 6);
    }

    #[tokio::test]
    async fn conflict_then_sold_out() {
        let (inner, catalog, product_id) =
            setup(&[("A1", 10), ("A2", 3)], &[("A1", 5), ("A2", 3)]).await;
        // Someone else takes the last A2 units first
        let ledger = RacingLedger::new(inner.clone(), 1, |_| vec![StockWrite::new("A2", 3, 0)]);
        let engine = SaleEngine::with_config(
            ledger,
            catalog,
            SaleConfig::new(5, Duration::ZERO),
        );

        let result = engine.sell(&product_id).await;

        assert!(matches!(result, Err(SaleError::ProductSoldOut(_))));
        assert_eq!(stock(&inner, "A1").await, 10);
        assert_eq!(stock(&inner, "A2").await, 0);
    }

    #[tokio::test]
    async fn retry_budget_exhausted_leaves_stock_unchanged() {
        let (inner, catalog, product_id) =
            setup(&[("A1", 100), ("A2", 100)], &[("A1", 1), ("A2", 1)]).await;
        // Every attempt loses to a one-unit restock of A1
        let bumps = AtomicU32::new(100);
        let ledger = RacingLedger::new(inner.clone(), u32::MAX, move |_| {
            let current = u64::from(bumps.fetch_add(1, Ordering::SeqCst));
            vec![StockWrite::new("A1", current, current + 1)]
        });
        let engine = SaleEngine::with_config(
            ledger,
            catalog,
            SaleConfig::new(3, Duration::ZERO),
        );

        let result = engine.sell(&product_id).await;

        assert!(matches!(
            result,
            Err(SaleError::Conflict { attempts: 3, .. })
        ));
        // Only the interfering restocks landed; nothing was deducted
        assert_eq!(stock(&inner, "A1").await, 103);
        assert_eq!(stock(&inner, "A2").await, 100);
    }

    #[tokio::test]
    async fn article_removed_mid_sale() {
        let (inner, catalog, product_id) =
            setup(&[("A1", 10), ("A2", 6)], &[("A1", 5), ("A2", 3)]).await;
        let mut ledger = RacingLedger::new(inner.clone(), 1, |_| Vec::new());
        ledger.removed = Some(ArticleId::new("A2"));
        let engine = SaleEngine::new(ledger, catalog);

        let result = engine.sell(&product_id).await;

        assert!(matches!(result, Err(SaleError::ArticleNotFound(id)) if id.as_str() == "A2"));
        assert_eq!(stock(&inner, "A1").await, 10);
    }

    #[tokio::test]
    async fn article_removed_while_another_line_conflicts() {
        let (inner, catalog, product_id) =
            setup(&[("A1", 10), ("A2", 6)], &[("A1", 5), ("A2", 3)]).await;
        // A1 is restocked and A2 deleted in the same window; the write
        // fails on A1 first
        let mut ledger =
            RacingLedger::new(inner.clone(), 1, |_| vec![StockWrite::new("A1", 10, 12)]);
        ledger.removed = Some(ArticleId::new("A2"));
        let engine = SaleEngine::with_config(
            ledger,
            catalog,
            SaleConfig::new(5, Duration::ZERO),
        );

        let result = engine.sell(&product_id).await;

        assert!(matches!(result, Err(SaleError::ArticleNotFound(id)) if id.as_str() == "A2"));
        assert_eq!(stock(&inner, "A1").await, 12);
        assert_eq!(inner.get(&ArticleId::new("A2")).await.unwrap(), None);
    }

    #[test]
    fn vanished_article_ignores_articles_never_seen() {
        let bom = bom(&[("A1", 1), ("A2", 1), ("A3", 1)]);
        let before = StockSnapshot::from_articles([
            Article::new("A1", "leg", 4),
            Article::new("A2", "seat", 4),
        ]);
        let after = StockSnapshot::from_articles([Article::new("A1", "leg", 2)]);

        assert_eq!(
            vanished_article(&bom, &before, &after),
            Some(&ArticleId::new("A2"))
        );
        assert_eq!(vanished_article(&bom, &before, &before), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sales_of_last_unit() {
        let (ledger, catalog, product_id) =
            setup(&[("A1", 5), ("A2", 3)], &[("A1", 5), ("A2", 3)]).await;
        let engine = Arc::new(SaleEngine::new(ledger.clone(), catalog));

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let engine = engine.clone();
                let product_id = product_id.clone();
                tokio::spawn(async move { engine.sell(&product_id).await })
            })
            .collect();

        let mut sold = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => sold += 1,
                Err(SaleError::ProductSoldOut(_)) | Err(SaleError::Conflict { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(sold, 1);
        assert_eq!(stock(&ledger, "A1").await, 0);
        assert_eq!(stock(&ledger, "A2").await, 0);
    }
}
