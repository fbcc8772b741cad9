//! Inventory upload and listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::Article;
use engine::{RestockEntry, RestockReport};
use serde::{Deserialize, Serialize};
use stock_store::{ArticleLedger, ProductCatalog};

use crate::AppState;
use crate::error::{ApiError, status_for};
use crate::routes::{RawQuantity, RejectedEntry};

// -- Request types --

#[derive(Deserialize)]
pub struct InventoryUpload {
    pub inventory: Vec<InventoryArticle>,
}

#[derive(Deserialize)]
pub struct InventoryArticle {
    pub art_id: String,
    pub name: String,
    pub stock: RawQuantity,
}

// -- Response types --

#[derive(Serialize)]
pub struct ArticleResponse {
    pub art_id: String,
    pub name: String,
    pub stock: u64,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            art_id: article.id.to_string(),
            name: article.name,
            stock: article.stock,
        }
    }
}

#[derive(Serialize)]
pub struct RestockResponse {
    pub applied: Vec<ArticleResponse>,
    pub rejected: Vec<RejectedEntry>,
}

impl From<RestockReport> for RestockResponse {
    fn from(report: RestockReport) -> Self {
        Self {
            applied: report.applied.into_iter().map(Into::into).collect(),
            rejected: report
                .failures
                .into_iter()
                .map(|failure| RejectedEntry {
                    id: failure.article_id.to_string(),
                    error: failure.error.to_string(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /api/inventory: merge a stock delivery into the ledger.
///
/// Responds 200 when every entry was applied and 422 when some were
/// rejected; the valid entries are applied either way.
#[tracing::instrument(skip(state, upload))]
pub async fn upload<L, C>(
    State(state): State<Arc<AppState<L, C>>>,
    Json(upload): Json<InventoryUpload>,
) -> Result<(StatusCode, Json<RestockResponse>), ApiError>
where
    L: ArticleLedger + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let entries = upload
        .inventory
        .into_iter()
        .map(|article| RestockEntry::new(article.art_id, article.name, article.stock.into_text()))
        .collect();

    let report = state.inventory.restock(entries).await?;
    let status = match report.failures.first() {
        None => StatusCode::OK,
        Some(failure) => status_for(failure.error.kind()),
    };

    Ok((status, Json(report.into())))
}

/// GET /api/inventory: list every article and its stock.
#[tracing::instrument(skip(state))]
pub async fn list<L, C>(
    State(state): State<Arc<AppState<L, C>>>,
) -> Result<Json<Vec<ArticleResponse>>, ApiError>
where
    L: ArticleLedger + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let articles = state.inventory.list_articles().await?;
    Ok(Json(articles.into_iter().map(Into::into).collect()))
}
