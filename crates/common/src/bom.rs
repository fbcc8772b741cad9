//! Bill of materials: which articles, and how many of each, make one unit of
//! a product.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ArticleId;

/// Errors raised when validating a bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BomError {
    /// A product must be made of at least one article.
    #[error("Bill of materials is empty")]
    EmptyBillOfMaterials,

    /// A line asked for zero units of an article.
    #[error("Article {0} has a quantity of zero")]
    ZeroQuantity(ArticleId),

    /// The same article was listed twice with different quantities.
    #[error("Article {article_id} listed with conflicting quantities {first} and {second}")]
    ConflictingLines {
        article_id: ArticleId,
        first: u64,
        second: u64,
    },
}

/// One line of a bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BomLine {
    /// The article consumed.
    pub article_id: ArticleId,

    /// Units of the article consumed per unit of product. Always positive.
    pub quantity_per_unit: u64,
}

impl BomLine {
    /// Creates a new line.
    pub fn new(article_id: impl Into<ArticleId>, quantity_per_unit: u64) -> Self {
        Self {
            article_id: article_id.into(),
            quantity_per_unit,
        }
    }
}

/// Validated, ordered bill of materials.
///
/// Never empty, every quantity is positive and every article appears once.
/// Line order is the order deductions are attempted and reported in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<BomLine>", into = "Vec<BomLine>")]
pub struct BillOfMaterials {
    lines: Vec<BomLine>,
}

impl BillOfMaterials {
    /// Validates and normalizes a list of lines.
    ///
    /// An article repeated with the same quantity collapses into its first
    /// occurrence; repeated with a different quantity it is rejected.
    pub fn new(lines: Vec<BomLine>) -> Result<Self, BomError> {
        if lines.is_empty() {
            return Err(BomError::EmptyBillOfMaterials);
        }

        let mut normalized: Vec<BomLine> = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity_per_unit == 0 {
                return Err(BomError::ZeroQuantity(line.article_id));
            }

            match normalized
                .iter()
                .find(|existing| existing.article_id == line.article_id)
            {
                Some(existing) if existing.quantity_per_unit == line.quantity_per_unit => {}
                Some(existing) => {
                    return Err(BomError::ConflictingLines {
                        article_id: line.article_id,
                        first: existing.quantity_per_unit,
                        second: line.quantity_per_unit,
                    });
                }
                None => normalized.push(line),
            }
        }

        Ok(Self { lines: normalized })
    }

    /// Returns the lines in order.
    pub fn lines(&self) -> &[BomLine] {
        &self.lines
    }

    /// Returns an iterator over the article IDs, in line order.
    pub fn article_ids(&self) -> impl Iterator<Item = &ArticleId> {
        self.lines.iter().map(|line| &line.article_id)
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false for a validated bill of materials.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl TryFrom<Vec<BomLine>> for BillOfMaterials {
    type Error = BomError;

    fn try_from(lines: Vec<BomLine>) -> Result<Self, Self::Error> {
        Self::new(lines)
    }
}

impl From<BillOfMaterials> for Vec<BomLine> {
    fn from(bom: BillOfMaterials) -> Self {
        bom.lines
    }
}

impl<'a> IntoIterator for &'a BillOfMaterials {
    type Item = &'a BomLine;
    type IntoIter = std::slice::Iter<'a, BomLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
