use async_trait::async_trait;

use crate::{Article, ArticleId, Result, StoreError};

/// Upper bound on conditional-write attempts in [`ArticleLedgerExt::create_or_increment`].
pub const MAX_INCREMENT_ATTEMPTS: u32 = 64;

/// Largest stock level any backend stores (PostgreSQL keeps stock in a `BIGINT`).
pub const MAX_STOCK: u64 = i64::MAX as u64;

/// A conditional stock write: set `new` only if the stock is still `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockWrite {
    pub article_id: ArticleId,
    pub expected: u64,
    pub new: u64,
}

impl StockWrite {
    /// Creates a new conditional write.
    pub fn new(article_id: impl Into<ArticleId>, expected: u64, new: u64) -> Self {
        Self {
            article_id: article_id.into(),
            expected,
            new,
        }
    }
}

/// A conditional decrement: remove `amount` units, provided the stock is
/// still `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDeduction {
    pub article_id: ArticleId,
    pub amount: u64,
    pub expected: u64,
}

impl StockDeduction {
    /// Creates a new conditional decrement.
    pub fn new(article_id: impl Into<ArticleId>, amount: u64, expected: u64) -> Self {
        Self {
            article_id: article_id.into(),
            amount,
            expected,
        }
    }
}

/// Outcome of a conditional write batch.
///
/// When a batch is rejected, nothing in it was applied. The reported article
/// is the first one, in batch order, that failed its check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every write in the batch was applied.
    Applied,

    /// The stored stock did not match the expected value.
    Conflict {
        article_id: ArticleId,
        expected: u64,
        actual: u64,
    },

    /// The article does not exist.
    NotFound(ArticleId),
}

impl WriteOutcome {
    /// Returns true if the batch was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

/// Storage primitives for article stock counters.
///
/// The only way to change an existing article's stock is
/// [`compare_and_swap`](ArticleLedger::compare_and_swap), which applies a
/// whole batch of conditional writes atomically or not at all.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ArticleLedger: Send + Sync {
    /// Gets an article by ID.
    async fn get(&self, article_id: &ArticleId) -> Result<Option<Article>>;

    /// Gets several articles at once. Missing IDs are omitted from the result.
    async fn get_many(&self, article_ids: &[ArticleId]) -> Result<Vec<Article>>;

    /// Lists every article, ordered by ID.
    async fn list_all(&self) -> Result<Vec<Article>>;

    /// Inserts the article unless one with the same ID exists.
    ///
    /// Returns true if the article was inserted.
    async fn insert_if_absent(&self, article: Article) -> Result<bool>;

    /// Applies all writes if every article's stock matches its expected value.
    ///
    /// Writes must target distinct articles.
    async fn compare_and_swap(&self, writes: Vec<StockWrite>) -> Result<WriteOutcome>;
}

/// Stock operations built on top of the ledger primitives.
#[async_trait]
pub trait ArticleLedgerExt: ArticleLedger {
    /// Adds `delta` units to an article, creating it with `stock = delta` if
    /// it does not exist yet.
    ///
    /// `name` is only used on creation. Concurrent increments of the same
    /// article are retried against the fresh value, never overwritten.
    async fn create_or_increment(
        &self,
        article_id: &ArticleId,
        name: &str,
        delta: u64,
    ) -> Result<Article> {
        let overflow = |stock: u64| StoreError::StockOverflow {
            article_id: article_id.clone(),
            stock,
            delta,
        };
        if delta > MAX_STOCK {
            return Err(overflow(0));
        }

        for attempt in 1..=MAX_INCREMENT_ATTEMPTS {
            let Some(current) = self.get(article_id).await? else {
                let article = Article::new(article_id.clone(), name, delta);
                if self.insert_if_absent(article.clone()).await? {
                    tracing::debug!(%article_id, stock = delta, "article created");
                    return Ok(article);
                }
                continue;
            };

            if delta == 0 {
                return Ok(current);
            }

            let new = current
                .stock
                .checked_add(delta)
                .filter(|new| *new <= MAX_STOCK)
                .ok_or_else(|| overflow(current.stock))?;

            let write = StockWrite::new(article_id.clone(), current.stock, new);
            match self.compare_and_swap(vec![write]).await? {
                WriteOutcome::Applied => {
                    tracing::debug!(%article_id, stock = new, "article restocked");
                    return Ok(Article {
                        stock: new,
                        ..current
                    });
                }
                WriteOutcome::Conflict { .. } | WriteOutcome::NotFound(_) => {
                    metrics::counter!("ledger_increment_conflicts_total").increment(1);
                    tracing::debug!(%article_id, attempt, "restock lost a race, retrying");
                }
            }
        }

        Err(StoreError::RetryExhausted {
            article_id: article_id.clone(),
            attempts: MAX_INCREMENT_ATTEMPTS,
        })
    }

    /// Removes `amount` units from an article if its stock is still
    /// `expected` and the result stays non-negative.
    async fn try_decrement(
        &self,
        article_id: &ArticleId,
        amount: u64,
        expected: u64,
    ) -> Result<WriteOutcome> {
        self.try_decrement_all(&[StockDeduction::new(article_id.clone(), amount, expected)])
            .await
    }

    /// Applies every deduction atomically, or none of them.
    ///
    /// A deduction whose expected stock cannot cover its amount is reported
    /// as a conflict against the currently stored value.
    async fn try_decrement_all(&self, deductions: &[StockDeduction]) -> Result<WriteOutcome> {
        let mut writes = Vec::with_capacity(deductions.len());
        for deduction in deductions {
            let Some(new) = deduction.expected.checked_sub(deduction.amount) else {
                return match self.get(&deduction.article_id).await? {
                    Some(article) => Ok(WriteOutcome::Conflict {
                        article_id: deduction.article_id.clone(),
                        expected: deduction.expected,
                        actual: article.stock,
                    }),
                    None => Ok(WriteOutcome::NotFound(deduction.article_id.clone())),
                };
            };
            writes.push(StockWrite::new(
                deduction.article_id.clone(),
                deduction.expected,
                new,
            ));
        }

        self.compare_and_swap(writes).await
    }
}

// Blanket implementation for all ArticleLedger implementations
impl<T: ArticleLedger + ?Sized> ArticleLedgerExt for T {}

/// Validates a write batch before it reaches storage.
pub fn validate_writes(writes: &[StockWrite]) -> Result<()> {
    for (i, write) in writes.iter().enumerate() {
        if writes[..i].iter().any(|w| w.article_id == write.article_id) {
            return Err(StoreError::DuplicateWrite(write.article_id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_writes_rejects_duplicates() {
        let writes = vec![
            StockWrite::new("1", 10, 5),
            StockWrite::new("2", 6, 3),
            StockWrite::new("1", 5, 0),
        ];
        assert!(matches!(
            validate_writes(&writes),
            Err(StoreError::DuplicateWrite(id)) if id.as_str() == "1"
        ));
    }

    #[test]
    fn validate_writes_accepts_distinct_and_empty() {
        assert!(validate_writes(&[]).is_ok());
        assert!(validate_writes(&[StockWrite::new("1", 1, 0), StockWrite::new("2", 1, 0)]).is_ok());
    }
}
