//! Merging inventory deltas into the article ledger.

use common::{Article, ArticleId};
use stock_store::{ArticleLedger, ArticleLedgerExt, StoreError};

use crate::error::{IntakeError, parse_quantity};

/// One line of an inventory delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestockEntry {
    pub article_id: ArticleId,
    /// Used only if the article is new to the ledger.
    pub name: String,
    /// Units received, as supplied. Must parse as a non-negative integer.
    pub stock_delta: String,
}

impl RestockEntry {
    pub fn new(
        article_id: impl Into<ArticleId>,
        name: impl Into<String>,
        stock_delta: impl Into<String>,
    ) -> Self {
        Self {
            article_id: article_id.into(),
            name: name.into(),
            stock_delta: stock_delta.into(),
        }
    }
}

/// An entry that was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct RestockFailure {
    pub article_id: ArticleId,
    pub error: IntakeError,
}

/// Result of applying a delivery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestockReport {
    /// Articles as stored after each applied entry, in input order.
    pub applied: Vec<Article>,
    pub failures: Vec<RestockFailure>,
}

impl RestockReport {
    /// Returns true if every entry was applied.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Applies inventory deliveries to the ledger.
#[derive(Clone)]
pub struct RestockProcessor<L> {
    ledger: L,
}

impl<L: ArticleLedger> RestockProcessor<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Adds each entry's delta to its article, creating unknown articles.
    ///
    /// Entries with an unparseable delta, or whose delta would push the
    /// stock past [`MAX_STOCK`](stock_store::MAX_STOCK), are reported and
    /// skipped; the rest are still applied. Any other storage failure aborts
    /// the remaining entries, leaving those already applied in place.
    #[tracing::instrument(skip(self, entries), fields(entries = entries.len()))]
    pub async fn apply_restock(
        &self,
        entries: Vec<RestockEntry>,
    ) -> Result<RestockReport, StoreError> {
        let mut report = RestockReport::default();

        for entry in entries {
            match self.apply_entry(&entry).await? {
                Ok(article) => {
                    metrics::counter!("restock_entries_total", "result" => "applied").increment(1);
                    tracing::debug!(article_id = %article.id, stock = article.stock, "restock applied");
                    report.applied.push(article);
                }
                Err(error) => {
                    metrics::counter!("restock_entries_total", "result" => "rejected")
                        .increment(1);
                    tracing::warn!(article_id = %entry.article_id, %error, "restock entry rejected");
                    report.failures.push(RestockFailure {
                        article_id: entry.article_id,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            applied = report.applied.len(),
            rejected = report.failures.len(),
            "restock processed"
        );
        Ok(report)
    }

    /// Applies one entry. The outer error aborts the batch, the inner one
    /// rejects only this entry.
    async fn apply_entry(
        &self,
        entry: &RestockEntry,
    ) -> Result<Result<Article, IntakeError>, StoreError> {
        let delta = match parse_quantity(&entry.stock_delta) {
            Ok(delta) => delta,
            Err(error) => return Ok(Err(error)),
        };

        match self
            .ledger
            .create_or_increment(&entry.article_id, &entry.name, delta)
            .await
        {
            Ok(article) => Ok(Ok(article)),
            Err(error @ (StoreError::StockOverflow { .. } | StoreError::OutOfRange { .. })) => {
                Ok(Err(IntakeError::StockLimit(error.to_string())))
            }
            Err(error) => Err(error),
        }
    }
}
