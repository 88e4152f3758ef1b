//! Message turns: log diagnostics, classify, dispatch by intent, send exactly one reply.

use crate::bot::{AssistantBot, TurnContext};
use crate::channels::ChannelError;
use crate::classification::{
    Classification, ClassificationResult, Product, FALLBACK_RESPONSE_TEXT,
};

pub const UPDATE_CART_TEXT: &str =
    "Once I get your session information, I will be able to update your shopping cart.";
pub const VIEW_CART_TEXT: &str =
    "Once I get your session information, I will be able to display your shopping cart.";
pub const PLACE_ORDER_TEXT: &str =
    "Once I get your session information, I will be able to place your order.";

/// Fixed reply for intents that are acknowledged but cannot be acted on without session data.
pub fn placeholder_text(classification: Classification) -> Option<&'static str> {
    match classification {
        Classification::UpdateCart => Some(UPDATE_CART_TEXT),
        Classification::ViewCart => Some(VIEW_CART_TEXT),
        Classification::PlaceOrder => Some(PLACE_ORDER_TEXT),
        Classification::SearchProducts | Classification::Other => None,
    }
}

/// The reply that was sent for a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub conversation_id: String,
    pub text: String,
    pub classification: Option<Classification>,
    pub product_ids: Vec<String>,
    pub products: Vec<Product>,
}

impl AssistantBot {
    /// Handle one message turn. Classifier and responder failures fall back to the default text;
    /// the only error returned is a failed send.
    pub async fn on_message(&self, ctx: &TurnContext<'_>) -> Result<OutboundMessage, ChannelError> {
        log_turn_context(ctx);

        let text = ctx.turn.text.to_lowercase();
        let result = self.resolve_reply(&ctx.turn.id, &text).await;

        ctx.send_text(&result.response_text).await?;
        log::debug!(
            "turn {}: replied ({}) in conversation {}",
            ctx.turn.id,
            result
                .classification
                .map(|c| c.label())
                .unwrap_or("unrecognized"),
            ctx.turn.conversation_id
        );

        Ok(OutboundMessage {
            conversation_id: ctx.turn.conversation_id.clone(),
            text: result.response_text,
            classification: result.classification,
            product_ids: result.response_product_ids.unwrap_or_default(),
            products: result.products.unwrap_or_default(),
        })
    }

    /// Classify `text` and build the reply for its intent.
    async fn resolve_reply(&self, turn_id: &str, text: &str) -> ClassificationResult {
        let classified = match self.classifier.classify(text).await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("turn {}: classification failed: {}", turn_id, e);
                return ClassificationResult::classified(Classification::Other);
            }
        };

        let Some(classification) = classified.classification else {
            log::info!("turn {}: unrecognized classification", turn_id);
            return ClassificationResult::default();
        };

        if let Some(placeholder) = placeholder_text(classification) {
            return classified.with_response_text(placeholder);
        }

        match self.responder.complete(text, classification).await {
            Ok(mut r) => {
                if r.response_text.trim().is_empty() {
                    log::info!(
                        "turn {}: empty completion for {}, using fallback",
                        turn_id,
                        classification
                    );
                    r.response_text = FALLBACK_RESPONSE_TEXT.to_string();
                }
                r
            }
            Err(e) => {
                log::warn!("turn {}: completion for {} failed: {}", turn_id, classification, e);
                ClassificationResult::classified(classification)
            }
        }
    }
}

/// Log the turn's text, metadata, session id and request host.
fn log_turn_context(ctx: &TurnContext<'_>) {
    let turn = ctx.turn;
    log::info!("turn {}: text: {}", turn.id, turn.text);
    log::info!(
        "turn {}: channel: {} conversation: {} from: {}",
        turn.id,
        turn.channel_id,
        turn.conversation_id,
        turn.from.id
    );
    log::info!(
        "turn {}: metadata: {}",
        turn.id,
        serde_json::Value::Object(turn.metadata.clone())
    );
    log::info!("turn {}: sessionid: {:?}", turn.id, turn.session_id());
    log::info!("turn {}: host: {:?}", turn.id, ctx.request.host);
}
