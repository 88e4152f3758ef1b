//! Classifier and Responder backed by an Ollama chat model.

use crate::classification::{
    Classification, ClassificationResult, Classifier, ClassifyError, Product, Responder,
};
use crate::llm::{ChatMessage, OllamaClient, OllamaError};
use async_trait::async_trait;
use serde::Deserialize;

const CLASSIFY_PROMPT: &str = "You classify messages sent to the Azure Pet Store assistant. \
Reply with exactly one label and nothing else:\n\
update_shopping_cart - the user wants to add, remove or change items in their cart\n\
view_shopping_cart - the user wants to see their cart\n\
place_order - the user wants to check out or place an order\n\
search_for_products - the user is looking for products the store sells\n\
something_else - anything else, including questions about pet animals";

const COMPLETE_PROMPT: &str = "You are the Azure Pet Store assistant. Answer the user's message \
briefly and helpfully. The store sells dog, cat and fish products. \
Respond with a JSON object: {\"response\": string, \"productIds\": [string], \
\"products\": [{\"id\": string, \"name\": string, \"category\": string}]}. \
Only list productIds and products when you recommend specific products.";

impl From<OllamaError> for ClassifyError {
    fn from(e: OllamaError) -> Self {
        ClassifyError::Backend(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionPayload {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    product_ids: Vec<String>,
    #[serde(default)]
    products: Vec<Product>,
}

/// Classification and completion against one Ollama model.
#[derive(Clone)]
pub struct OllamaAssistant {
    client: OllamaClient,
    model: String,
}

impl OllamaAssistant {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }
}

/// Map the model's label reply to a result; unknown labels leave `classification` unset.
fn parse_classification(content: &str) -> ClassificationResult {
    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    match Classification::from_label(first_line) {
        Some(c) => ClassificationResult::classified(c),
        None => {
            log::debug!("classifier: unrecognized label {:?}", first_line);
            ClassificationResult::default()
        }
    }
}

/// Build the completion result. JSON replies contribute text, product ids and products; other non-empty
/// content is taken as plain text; empty content keeps the fallback text.
fn parse_completion(content: &str, classification: Classification) -> ClassificationResult {
    let mut result = ClassificationResult::classified(classification);
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return result;
    }
    match serde_json::from_str::<CompletionPayload>(trimmed) {
        Ok(payload) => {
            if let Some(text) = payload.response.filter(|t| !t.trim().is_empty()) {
                result.response_text = text;
            }
            if !payload.product_ids.is_empty() {
                result.response_product_ids = Some(payload.product_ids);
            }
            if !payload.products.is_empty() {
                result.products = Some(payload.products);
            }
        }
        Err(_) => result.response_text = trimmed.to_string(),
    }
    result
}

#[async_trait]
impl Classifier for OllamaAssistant {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
        let messages = vec![ChatMessage::system(CLASSIFY_PROMPT), ChatMessage::user(text)];
        let res = self.client.chat(&self.model, messages, false).await?;
        if res.message.is_none() {
            return Err(ClassifyError::InvalidResponse("no message in reply".to_string()));
        }
        Ok(parse_classification(res.content()))
    }
}

#[async_trait]
impl Responder for OllamaAssistant {
    async fn complete(
        &self,
        text: &str,
        classification: Classification,
    ) -> Result<ClassificationResult, ClassifyError> {
        let messages = vec![
            ChatMessage::system(format!("{}\nIntent: {}", COMPLETE_PROMPT, classification)),
            ChatMessage::user(text),
        ];
        let res = self.client.chat(&self.model, messages, true).await?;
        Ok(parse_completion(res.content(), classification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::FALLBACK_RESPONSE_TEXT;

    #[test]
    fn classification_reads_first_non_empty_line() {
        let r = parse_classification("\n search_for_products \nbecause they asked");
        assert_eq!(r.classification, Some(Classification::SearchProducts));
        assert_eq!(r.response_text, FALLBACK_RESPONSE_TEXT);
    }

    #[test]
    fn unknown_label_is_unrecognized() {
        let r = parse_classification("I think this is about refunds");
        assert_eq!(r.classification, None);
        assert_eq!(r.response_text, FALLBACK_RESPONSE_TEXT);
    }

    #[test]
    fn completion_json_sets_text_and_products() {
        let r = parse_completion(
            r#"{"response":"We carry Ball and Chain dog food.","productIds":["11","12"]}"#,
            Classification::SearchProducts,
        );
        assert_eq!(r.classification, Some(Classification::SearchProducts));
        assert_eq!(r.response_text, "We carry Ball and Chain dog food.");
        assert_eq!(
            r.response_product_ids,
            Some(vec!["11".to_string(), "12".to_string()])
        );
    }

    #[test]
    fn completion_json_carries_products() {
        let r = parse_completion(
            r#"{"response":"Try these.","products":[{"id":"7","name":"Chew Toy","category":"Dog Toys"}]}"#,
            Classification::SearchProducts,
        );
        let products = r.products.expect("products");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "7");
        assert_eq!(products[0].name.as_deref(), Some("Chew Toy"));
        assert_eq!(products[0].category.as_deref(), Some("Dog Toys"));
        assert!(r.response_product_ids.is_none());
    }

    #[test]
    fn completion_plain_text_is_used_verbatim() {
        let r = parse_completion("  Cats sleep a lot.  ", Classification::Other);
        assert_eq!(r.response_text, "Cats sleep a lot.");
        assert!(r.response_product_ids.is_none());
    }

    #[test]
    fn completion_empty_keeps_fallback() {
        let r = parse_completion("   ", Classification::Other);
        assert_eq!(r.response_text, FALLBACK_RESPONSE_TEXT);
        let r = parse_completion(r#"{"response":""}"#, Classification::Other);
        assert_eq!(r.response_text, FALLBACK_RESPONSE_TEXT);
    }
}
