//! Catalog uploads.

use common::{ArticleId, BillOfMaterials, BomLine, Price, Product};
use stock_store::{ProductCatalog, StoreError};

use crate::error::{IntakeError, parse_positive_quantity};

/// One bill of materials line as supplied by the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLine {
    pub article_id: ArticleId,
    /// Units per product, as supplied. Must parse as a positive integer.
    pub amount_of: String,
}

impl DraftLine {
    pub fn new(article_id: impl Into<ArticleId>, amount_of: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            amount_of: amount_of.into(),
        }
    }
}

/// A product definition awaiting validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub price: f64,
    pub lines: Vec<DraftLine>,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, price: f64, lines: Vec<DraftLine>) -> Self {
        Self {
            name: name.into(),
            price,
            lines,
        }
    }

    /// Validates the draft into a price and bill of materials.
    pub fn validate(&self) -> Result<(Price, BillOfMaterials), IntakeError> {
        if self.name.trim().is_empty() {
            return Err(IntakeError::EmptyName);
        }
        let price = Price::from_decimal(self.price)?;

        let lines = self
            .lines
            .iter()
            .map(|line| {
                parse_positive_quantity(&line.amount_of)
                    .map(|quantity| BomLine::new(line.article_id.clone(), quantity))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((price, BillOfMaterials::new(lines)?))
    }
}

/// A product that was not stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogFailure {
    pub product_name: String,
    pub error: IntakeError,
}

/// Result of a catalog upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogReport {
    /// Products as stored, in input order.
    pub upserted: Vec<Product>,
    pub failures: Vec<CatalogFailure>,
}

impl CatalogReport {
    /// Returns true if every product was stored.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validates product definitions and merges them into the catalog by name.
#[derive(Clone)]
pub struct CatalogIntake<C> {
    catalog: C,
}

impl<C: ProductCatalog> CatalogIntake<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Upserts every valid draft; invalid ones are reported and skipped.
    #[tracing::instrument(skip(self, drafts), fields(drafts = drafts.len()))]
    pub async fn upload(&self, drafts: Vec<ProductDraft>) -> Result<CatalogReport, StoreError> {
        let mut report = CatalogReport::default();

        for draft in drafts {
            let (price, bill_of_materials) = match draft.validate() {
                Ok(valid) => valid,
                Err(error) => {
                    tracing::warn!(product = %draft.name, %error, "product rejected");
                    report.failures.push(CatalogFailure {
                        product_name: draft.name,
                        error,
                    });
                    continue;
                }
            };

            let product = self
                .catalog
                .upsert_by_name(&draft.name, price, bill_of_materials)
                .await?;
            metrics::counter!("catalog_upserts_total").increment(1);
            tracing::debug!(product_id = %product.id, name = %product.name, "product stored");
            report.upserted.push(product);
        }

        tracing::info!(
            upserted = report.upserted.len(),
            rejected = report.failures.len(),
            "catalog upload processed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use common::{BomError, PriceError};
    use stock_store::InMemoryProductCatalog;

    use super::*;

    fn chair(lines: &[(&str, &str)]) -> ProductDraft {
        ProductDraft::new(
            "Dining Chair",
            10.0,
            lines.iter().map(|(id, q)| DraftLine::new(*id, *q)).collect(),
        )
    }

    #[tokio::test]
    async fn upload_stores_valid_products() {
        let catalog = InMemoryProductCatalog::new();
        let intake = CatalogIntake::new(catalog.clone());

        let report = intake
            .upload(vec![
                chair(&[("1", "4"), ("2", "8"), ("3", "1")]),
                ProductDraft::new("Dining Table", 25.5, vec![DraftLine::new("1", "4")]),
            ])
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.upserted.len(), 2);
        assert_eq!(report.upserted[1].price, Price::from_cents(2550));
        assert_eq!(catalog.product_count().await, 2);
    }

    #[tokio::test]
    async fn reupload_replaces_by_name_and_keeps_id() {
        let catalog = InMemoryProductCatalog::new();
        let intake = CatalogIntake::new(catalog.clone());

        let first = intake.upload(vec![chair(&[("1", "4")])]).await.unwrap();
        let second = intake
            .upload(vec![chair(&[("1", "2"), ("2", "1")])])
            .await
            .unwrap();

        assert_eq!(first.upserted[0].id, second.upserted[0].id);
        let stored = catalog.get_by_name("Dining Chair").await.unwrap().unwrap();
        assert_eq!(
            stored.bill_of_materials.lines(),
            &[BomLine::new("1", 2), BomLine::new("2", 1)]
        );
        assert_eq!(catalog.product_count().await, 1);
    }

    #[tokio::test]
    async fn invalid_products_are_reported_others_stored() {
        let catalog = InMemoryProductCatalog::new();
        let intake = CatalogIntake::new(catalog.clone());

        let report = intake
            .upload(vec![
                ProductDraft::new("Broken", 5.0, vec![DraftLine::new("1", "x")]),
                ProductDraft::new("Stool", 3.0, vec![DraftLine::new("1", "3")]),
                ProductDraft::new("Empty", 1.0, Vec::new()),
                ProductDraft::new("Free lunch", -2.0, vec![DraftLine::new("1", "1")]),
                ProductDraft::new("Gold plated", 1e300, vec![DraftLine::new("1", "1")]),
            ])
            .await
            .unwrap();

        assert_eq!(report.upserted.len(), 1);
        assert_eq!(report.upserted[0].name, "Stool");
        assert_eq!(
            report.failures,
            vec![
                CatalogFailure {
                    product_name: "Broken".to_string(),
                    error: IntakeError::InvalidQuantity("x".to_string()),
                },
                CatalogFailure {
                    product_name: "Empty".to_string(),
                    error: IntakeError::Bom(BomError::EmptyBillOfMaterials),
                },
                CatalogFailure {
                    product_name: "Free lunch".to_string(),
                    error: IntakeError::InvalidPrice(PriceError::Negative(-2.0)),
                },
                CatalogFailure {
                    product_name: "Gold plated".to_string(),
                    error: IntakeError::InvalidPrice(PriceError::OutOfRange(1e300)),
                },
            ]
        );
        assert!(catalog.get_by_name("Broken").await.unwrap().is_none());
    }

    #[test]
    fn validate_rejects_zero_quantity() {
        assert_eq!(
            chair(&[("1", "0")]).validate(),
            Err(IntakeError::InvalidQuantity("0".to_string()))
        );
    }

    #[test]
    fn validate_collapses_identical_duplicates() {
        let (_, bom) = chair(&[("1", "4"), ("2", "1"), ("1", "4")]).validate().unwrap();
        assert_eq!(bom.lines(), &[BomLine::new("1", 4), BomLine::new("2", 1)]);
    }

    #[test]
    fn validate_rejects_conflicting_duplicates() {
        assert_eq!(
            chair(&[("1", "4"), ("1", "2")]).validate(),
            Err(IntakeError::Bom(BomError::ConflictingLines {
                article_id: ArticleId::new("1"),
                first: 4,
                second: 2,
            }))
        );
    }

    #[test]
    fn validate_rejects_blank_name() {
        let draft = ProductDraft::new("  ", 1.0, vec![DraftLine::new("1", "1")]);
        assert_eq!(draft.validate(), Err(IntakeError::EmptyName));
    }
}
