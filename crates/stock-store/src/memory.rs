use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Article, ArticleId, BillOfMaterials, Price, Product, ProductId, Result,
    catalog::ProductCatalog,
    ledger::{ArticleLedger, StockWrite, WriteOutcome, validate_writes},
};

/// In-memory article ledger.
///
/// A compare-and-swap batch is checked and applied under one write lock, so
/// it is atomic across articles just like the PostgreSQL transaction.
#[derive(Clone, Default)]
pub struct InMemoryArticleLedger {
    articles: Arc<RwLock<BTreeMap<ArticleId, Article>>>,
}

impl InMemoryArticleLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger pre-populated with the given articles.
    pub fn with_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        let map = articles
            .into_iter()
            .map(|article| (article.id.clone(), article))
            .collect();
        Self {
            articles: Arc::new(RwLock::new(map)),
        }
    }

    /// Returns the number of articles stored.
    pub async fn article_count(&self) -> usize {
        self.articles.read().await.len()
    }

    /// Removes an article. Stands in for out-of-band administrative deletion.
    pub async fn remove(&self, article_id: &ArticleId) -> Option<Article> {
        self.articles.write().await.remove(article_id)
    }
}

#[async_trait]
impl ArticleLedger for InMemoryArticleLedger {
    async fn get(&self, article_id: &ArticleId) -> Result<Option<Article>> {
        Ok(self.articles.read().await.get(article_id).cloned())
    }

    async fn get_many(&self, article_ids: &[ArticleId]) -> Result<Vec<Article>> {
        let articles = self.articles.read().await;
        Ok(article_ids
            .iter()
            .filter_map(|id| articles.get(id).cloned())
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Article>> {
        Ok(self.articles.read().await.values().cloned().collect())
    }

    async fn insert_if_absent(&self, article: Article) -> Result<bool> {
        let mut articles = self.articles.write().await;
        if articles.contains_key(&article.id) {
            return Ok(false);
        }
        articles.insert(article.id.clone(), article);
        Ok(true)
    }

    async fn compare_and_swap(&self, writes: Vec<StockWrite>) -> Result<WriteOutcome> {
        validate_writes(&writes)?;

        let mut articles = self.articles.write().await;

        // Check every write before touching anything
        for write in &writes {
            match articles.get(&write.article_id) {
                None => return Ok(WriteOutcome::NotFound(write.article_id.clone())),
                Some(article) if article.stock != write.expected => {
                    return Ok(WriteOutcome::Conflict {
                        article_id: write.article_id.clone(),
                        expected: write.expected,
                        actual: article.stock,
                    });
                }
                Some(_) => {}
            }
        }

        for write in writes {
            if let Some(article) = articles.get_mut(&write.article_id) {
                article.stock = write.new;
            }
        }

        Ok(WriteOutcome::Applied)
    }
}

#[derive(Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    by_name: HashMap<String, ProductId>,
}

/// In-memory product catalog with a secondary index on name.
#[derive(Clone, Default)]
pub struct InMemoryProductCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryProductCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of products stored.
    pub async fn product_count(&self) -> usize {
        self.state.read().await.products.len()
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get_by_id(&self, product_id: &ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(product_id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state
            .by_name
            .get(name)
            .and_then(|id| state.products.get(id))
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn upsert_by_name(
        &self,
        name: &str,
        price: Price,
        bill_of_materials: BillOfMaterials,
    ) -> Result<Product> {
        let mut state = self.state.write().await;

        let existing = state
            .by_name
            .get(name)
            .and_then(|id| state.products.get(id));

        let product = match existing {
            Some(current) => current.revised(price, bill_of_materials),
            None => Product::create(name, price, bill_of_materials),
        };

        state
            .by_name
            .insert(product.name.clone(), product.id.clone());
        state.products.insert(product.id.clone(), product.clone());

        Ok(product)
    }
}
