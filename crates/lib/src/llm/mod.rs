//! Completion backend: Ollama client and the classifier/responder adapter built on it.

mod assistant;
mod ollama;

pub use assistant::OllamaAssistant;
pub(crate) use ollama::DEFAULT_BASE_URL;
pub use ollama::{ChatMessage, ChatResponse, OllamaClient, OllamaError};
