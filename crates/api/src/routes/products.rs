//! Catalog upload, sellable listing and sale endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Product, ProductId};
use engine::{CatalogReport, DraftLine, ProductDraft, SaleReceipt, SellableView};
use serde::{Deserialize, Serialize};
use stock_store::{ArticleLedger, ProductCatalog};

use crate::AppState;
use crate::error::{ApiError, status_for};
use crate::routes::{RawQuantity, RejectedEntry};

// -- Request types --

#[derive(Deserialize)]
pub struct ProductUpload {
    pub products: Vec<ProductRequest>,
}

#[derive(Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub price: f64,
    pub contain_articles: Vec<ProductArticleRequest>,
}

#[derive(Deserialize)]
pub struct ProductArticleRequest {
    pub art_id: String,
    pub amount_of: RawQuantity,
}

impl From<ProductRequest> for ProductDraft {
    fn from(request: ProductRequest) -> Self {
        ProductDraft::new(
            request.name,
            request.price,
            request
                .contain_articles
                .into_iter()
                .map(|line| DraftLine::new(line.art_id, line.amount_of.into_text()))
                .collect(),
        )
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductArticleResponse {
    pub art_id: String,
    pub amount_of: String,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub contain_articles: Vec<ProductArticleResponse>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            price: product.price.as_decimal(),
            contain_articles: product
                .bill_of_materials
                .lines()
                .iter()
                .map(|line| ProductArticleResponse {
                    art_id: line.article_id.to_string(),
                    amount_of: line.quantity_per_unit.to_string(),
                })
                .collect(),
            name: product.name,
        }
    }
}

#[derive(Serialize)]
pub struct SellableProductResponse {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub contain_articles: Vec<ProductArticleResponse>,
    pub quantity: u64,
}

impl From<SellableView> for SellableProductResponse {
    fn from(view: SellableView) -> Self {
        Self {
            id: view.product_id.to_string(),
            price: view.price.as_decimal(),
            contain_articles: view
                .bill_of_materials
                .lines()
                .iter()
                .map(|line| ProductArticleResponse {
                    art_id: line.article_id.to_string(),
                    amount_of: line.quantity_per_unit.to_string(),
                })
                .collect(),
            name: view.name,
            quantity: view.sellable_quantity,
        }
    }
}

#[derive(Serialize)]
pub struct CatalogResponse {
    pub upserted: Vec<ProductResponse>,
    pub rejected: Vec<RejectedEntry>,
}

impl From<CatalogReport> for CatalogResponse {
    fn from(report: CatalogReport) -> Self {
        Self {
            upserted: report.upserted.into_iter().map(Into::into).collect(),
            rejected: report
                .failures
                .into_iter()
                .map(|failure| RejectedEntry {
                    id: failure.product_name,
                    error: failure.error.to_string(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /api/products: merge product definitions into the catalog by name.
#[tracing::instrument(skip(state, upload))]
pub async fn upload<L, C>(
    State(state): State<Arc<AppState<L, C>>>,
    Json(upload): Json<ProductUpload>,
) -> Result<(StatusCode, Json<CatalogResponse>), ApiError>
where
    L: ArticleLedger + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let drafts = upload.products.into_iter().map(Into::into).collect();

    let report = state.inventory.upload_products(drafts).await?;
    let status = match report.failures.first() {
        None => StatusCode::OK,
        Some(failure) => status_for(failure.error.kind()),
    };

    Ok((status, Json(report.into())))
}

/// GET /api/products: list products that can be sold right now.
#[tracing::instrument(skip(state))]
pub async fn list<L, C>(
    State(state): State<Arc<AppState<L, C>>>,
) -> Result<Json<Vec<SellableProductResponse>>, ApiError>
where
    L: ArticleLedger + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let views = state.inventory.list_sellable().await?;
    Ok(Json(
        views
            .into_iter()
            .filter(SellableView::is_available)
            .map(Into::into)
            .collect(),
    ))
}

/// GET /api/products/{id}: one product with its current sellable quantity.
#[tracing::instrument(skip(state))]
pub async fn get<L, C>(
    State(state): State<Arc<AppState<L, C>>>,
    Path(id): Path<String>,
) -> Result<Json<SellableProductResponse>, ApiError>
where
    L: ArticleLedger + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let view = state
        .inventory
        .sellable(&ProductId::new(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product not found: {id}")))?;
    Ok(Json(view.into()))
}

/// PATCH /api/products/{id}: sell one unit.
#[tracing::instrument(skip(state))]
pub async fn sell<L, C>(
    State(state): State<Arc<AppState<L, C>>>,
    Path(id): Path<String>,
) -> Result<Json<SaleReceipt>, ApiError>
where
    L: ArticleLedger + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let receipt = state.inventory.sell(&ProductId::new(id)).await?;
    Ok(Json(receipt))
}
