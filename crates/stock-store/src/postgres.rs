use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Article, ArticleId, BillOfMaterials, Price, Product, ProductId, Result, StoreError,
    catalog::ProductCatalog,
    ledger::{ArticleLedger, StockWrite, WriteOutcome, validate_writes},
};

/// PostgreSQL-backed article ledger and product catalog.
#[derive(Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    /// Creates a new PostgreSQL stock store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_article(row: PgRow) -> Result<Article> {
        let stock: i64 = row.try_get("stock")?;
        Ok(Article {
            id: ArticleId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            stock: u64::try_from(stock).map_err(|_| StoreError::out_of_range("stock", stock))?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let price_cents: i64 = row.try_get("price_cents")?;
        let bom_json: serde_json::Value = row.try_get("bill_of_materials")?;
        let bill_of_materials: BillOfMaterials = serde_json::from_value(bom_json)?;

        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            price: Price::from_cents(
                u64::try_from(price_cents)
                    .map_err(|_| StoreError::out_of_range("price_cents", price_cents))?,
            ),
            bill_of_materials,
        })
    }

    fn to_db_count(field: &'static str, value: u64) -> Result<i64> {
        i64::try_from(value).map_err(|_| StoreError::out_of_range(field, value))
    }
}

#[async_trait]
impl ArticleLedger for PostgresStockStore {
    async fn get(&self, article_id: &ArticleId) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT id, name, stock FROM articles WHERE id = $1")
            .bind(article_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_article).transpose()
    }

    async fn get_many(&self, article_ids: &[ArticleId]) -> Result<Vec<Article>> {
        let ids: Vec<String> = article_ids.iter().map(ArticleId::to_string).collect();
        let rows = sqlx::query("SELECT id, name, stock FROM articles WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        let mut found: HashMap<ArticleId, Article> = rows
            .into_iter()
            .map(|row| Self::row_to_article(row).map(|a| (a.id.clone(), a)))
            .collect::<Result<_>>()?;

        // Preserve the caller's ordering
        Ok(article_ids
            .iter()
            .filter_map(|id| found.remove(id))
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query("SELECT id, name, stock FROM articles ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_article).collect()
    }

    async fn insert_if_absent(&self, article: Article) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (id, name, stock)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(article.id.as_str())
        .bind(&article.name)
        .bind(Self::to_db_count("stock", article.stock)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn compare_and_swap(&self, writes: Vec<StockWrite>) -> Result<WriteOutcome> {
        validate_writes(&writes)?;
        if writes.is_empty() {
            return Ok(WriteOutcome::Applied);
        }

        let mut tx = self.pool.begin().await?;

        // Lock in id order so concurrent batches over overlapping articles
        // queue up instead of deadlocking.
        let ids: Vec<String> = writes.iter().map(|w| w.article_id.to_string()).collect();
        let rows = sqlx::query(
            "SELECT id, stock FROM articles WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut current: HashMap<String, i64> = HashMap::with_capacity(rows.len());
        for row in rows {
            current.insert(row.try_get("id")?, row.try_get("stock")?);
        }

        for write in &writes {
            let Some(&stock) = current.get(write.article_id.as_str()) else {
                // Dropping the transaction rolls it back
                return Ok(WriteOutcome::NotFound(write.article_id.clone()));
            };
            let actual =
                u64::try_from(stock).map_err(|_| StoreError::out_of_range("stock", stock))?;
            if actual != write.expected {
                return Ok(WriteOutcome::Conflict {
                    article_id: write.article_id.clone(),
                    expected: write.expected,
                    actual,
                });
            }
        }

        for write in &writes {
            sqlx::query("UPDATE articles SET stock = $2 WHERE id = $1")
                .bind(write.article_id.as_str())
                .bind(Self::to_db_count("stock", write.new)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(WriteOutcome::Applied)
    }
}

#[async_trait]
impl ProductCatalog for PostgresStockStore {
    async fn get_by_id(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, bill_of_materials FROM products WHERE id = $1",
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, bill_of_materials FROM products WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, name, price_cents, bill_of_materials FROM products ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn upsert_by_name(
        &self,
        name: &str,
        price: Price,
        bill_of_materials: BillOfMaterials,
    ) -> Result<Product> {
        let bom_json = serde_json::to_value(&bill_of_materials)?;

        let row = sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, bill_of_materials)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE SET
                price_cents = EXCLUDED.price_cents,
                bill_of_materials = EXCLUDED.bill_of_materials
            RETURNING id, name, price_cents, bill_of_materials
            "#,
        )
        .bind(ProductId::generate().to_string())
        .bind(name)
        .bind(Self::to_db_count("price_cents", price.cents())?)
        .bind(bom_json)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }
}
