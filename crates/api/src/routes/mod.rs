//! HTTP route handlers.

pub mod health;
pub mod inventory;
pub mod metrics;
pub mod products;

use serde::{Deserialize, Serialize};

/// A quantity as it arrives on the wire.
///
/// Uploads carry quantities as strings (`"12"`), but plain JSON numbers are
/// accepted too. Either way the engine parses the text, so a malformed value
/// fails only its own entry instead of the whole request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity {
    Text(String),
    Number(serde_json::Number),
}

impl RawQuantity {
    pub fn into_text(self) -> String {
        match self {
            RawQuantity::Text(text) => text,
            RawQuantity::Number(number) => number.to_string(),
        }
    }
}

/// One rejected upload entry.
#[derive(Debug, Serialize)]
pub struct RejectedEntry {
    pub id: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_quantity_accepts_strings_and_numbers() {
        let text: RawQuantity = serde_json::from_str("\"12\"").unwrap();
        let number: RawQuantity = serde_json::from_str("12").unwrap();
        let negative: RawQuantity = serde_json::from_str("-3").unwrap();

        assert_eq!(text.into_text(), "12");
        assert_eq!(number.into_text(), "12");
        assert_eq!(negative.into_text(), "-3");
    }
}
