//! Intent classification: the tag set, the result the bot replies from, and the
//! Classifier/Responder seams backed by an external service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reply text used whenever no better answer is available.
pub const FALLBACK_RESPONSE_TEXT: &str = "I am not sure how to handle that.";

/// Intent computed by the external classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[serde(rename = "update_shopping_cart")]
    UpdateCart,
    #[serde(rename = "view_shopping_cart")]
    ViewCart,
    PlaceOrder,
    #[serde(rename = "search_for_products")]
    SearchProducts,
    #[serde(rename = "something_else")]
    Other,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::UpdateCart,
        Classification::ViewCart,
        Classification::PlaceOrder,
        Classification::SearchProducts,
        Classification::Other,
    ];

    /// Wire label (e.g. `search_for_products`).
    pub fn label(self) -> &'static str {
        match self {
            Classification::UpdateCart => "update_shopping_cart",
            Classification::ViewCart => "view_shopping_cart",
            Classification::PlaceOrder => "place_order",
            Classification::SearchProducts => "search_for_products",
            Classification::Other => "something_else",
        }
    }

    /// Parse a label leniently (case, surrounding whitespace/punctuation, spaces or dashes for underscores).
    pub fn from_label(s: &str) -> Option<Self> {
        let norm: String = s
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        Self::ALL.into_iter().find(|c| c.label() == norm)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Catalog product referenced by a reply. Owned by the external catalog; carried opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Outcome of classification/completion for one turn.
///
/// `classification` is `None` when the service returned a tag the bot does not know.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub classification: Option<Classification>,
    pub response_text: String,
    pub products: Option<Vec<Product>>,
    pub response_product_ids: Option<Vec<String>>,
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self {
            classification: None,
            response_text: FALLBACK_RESPONSE_TEXT.to_string(),
            products: None,
            response_product_ids: None,
        }
    }
}

impl ClassificationResult {
    pub fn classified(classification: Classification) -> Self {
        Self {
            classification: Some(classification),
            ..Self::default()
        }
    }

    pub fn with_response_text(mut self, text: impl Into<String>) -> Self {
        self.response_text = text.into();
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("classification backend unavailable: {0}")]
    Backend(String),
    #[error("classification response invalid: {0}")]
    InvalidResponse(String),
}

/// Maps free text to an intent.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError>;
}

/// Produces reply text (and optionally products) for open-ended intents.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn complete(
        &self,
        text: &str,
        classification: Classification,
    ) -> Result<ClassificationResult, ClassifyError>;
}
