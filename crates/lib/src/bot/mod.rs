//! The assistant bot: per-turn intent dispatch and greeting of new members.
//!
//! Handlers take plain data (a [`TurnContext`]) and are invoked by the gateway for each
//! inbound activity; the bot holds no per-conversation state.

mod context;
mod greeter;
mod turn;

pub use context::TurnContext;
pub use greeter::{GreetingReport, WELCOME_TEXT};
pub use turn::{
    placeholder_text, OutboundMessage, PLACE_ORDER_TEXT, UPDATE_CART_TEXT, VIEW_CART_TEXT,
};

use crate::classification::{Classifier, Responder};
use crate::config::Config;
use crate::llm::{OllamaAssistant, OllamaClient};
use std::sync::Arc;

/// Turn orchestrator and membership greeter over a pluggable classifier and responder.
#[derive(Clone)]
pub struct AssistantBot {
    classifier: Arc<dyn Classifier>,
    responder: Arc<dyn Responder>,
}

impl AssistantBot {
    pub fn new(classifier: Arc<dyn Classifier>, responder: Arc<dyn Responder>) -> Self {
        Self {
            classifier,
            responder,
        }
    }

    /// Bot backed by the configured Ollama model for both classification and completion.
    pub fn from_config(config: &Config) -> Self {
        let client = OllamaClient::new(Some(crate::config::resolve_assistant_base_url(config)));
        let backend = Arc::new(OllamaAssistant::new(
            client,
            crate::config::resolve_assistant_model(config),
        ));
        log::info!(
            "assistant: using model {} at {}",
            backend.model(),
            backend.base_url()
        );
        Self::new(backend.clone(), backend)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Hand-written fakes for the bot's collaborators.

    use crate::channels::{ChannelError, ChannelHandle};
    use crate::classification::{
        Classification, ClassificationResult, Classifier, ClassifyError, Responder,
    };
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    pub struct FakeClassifier {
        pub result: Option<ClassificationResult>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeClassifier {
        pub fn returning(result: ClassificationResult) -> Self {
            Self {
                result: Some(result),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                result: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Classifier for FakeClassifier {
        async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
            self.calls.lock().unwrap().push(text.to_string());
            self.result
                .clone()
                .ok_or_else(|| ClassifyError::Backend("connection refused".to_string()))
        }
    }

    pub struct FakeResponder {
        pub reply: Option<String>,
        pub calls: Mutex<Vec<(String, Classification)>>,
    }

    impl FakeResponder {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Responder for FakeResponder {
        async fn complete(
            &self,
            text: &str,
            classification: Classification,
        ) -> Result<ClassificationResult, ClassifyError> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), classification));
            match self.reply {
                Some(ref r) => Ok(ClassificationResult::classified(classification)
                    .with_response_text(r.clone())),
                None => Err(ClassifyError::InvalidResponse("garbled".to_string())),
            }
        }
    }

    /// Records every send; sends whose 0-based call index is in `fail_calls` fail.
    #[derive(Default)]
    pub struct RecordingChannel {
        pub sent: Mutex<Vec<(String, String)>>,
        pub attempts: Mutex<usize>,
        pub fail_calls: HashSet<usize>,
    }

    impl RecordingChannel {
        pub fn failing_on(calls: &[usize]) -> Self {
            Self {
                fail_calls: calls.iter().copied().collect(),
                ..Self::default()
            }
        }

        pub fn sent_texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, t)| t.clone())
                .collect()
        }

        pub fn attempt_count(&self) -> usize {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChannelHandle for RecordingChannel {
        fn id(&self) -> &str {
            "recording"
        }

        fn stop(&self) {}

        async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), ChannelError> {
            let call = {
                let mut attempts = self.attempts.lock().unwrap();
                let n = *attempts;
                *attempts += 1;
                n
            };
            if self.fail_calls.contains(&call) {
                return Err(ChannelError::Api("429 Too Many Requests".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((conversation_id.to_string(), text.to_string()));
            Ok(())
        }
    }
}
