//! Ollama API client (http://127.0.0.1:11434 by default).

use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Client for Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error("ollama request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("ollama api error: {0}")]
    Api(String),
}

impl OllamaClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /api/chat — non-streaming chat completion. `format: "json"` asks the model for a JSON object.
    pub async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        json_format: bool,
    ) -> Result<ChatResponse, OllamaError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: model.to_string(),
            messages,
            stream: false,
            format: json_format.then(|| "json".to_string()),
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(OllamaError::Api(format!("{} {}", status, body)));
        }
        let data: ChatResponse = res.json().await?;
        Ok(data)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: Option<ChatMessage>,
}

impl ChatResponse {
    /// Text content of the assistant message, if any.
    pub fn content(&self) -> &str {
        self.message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_trailing_slash() {
        let c = OllamaClient::new(Some("http://gpu-box:11434/".to_string()));
        assert_eq!(c.base_url(), "http://gpu-box:11434");
        assert_eq!(OllamaClient::new(None).base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn chat_request_omits_format_when_plain() {
        let req = ChatRequest {
            model: "m".into(),
            messages: vec![ChatMessage::user("hi")],
            stream: false,
            format: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("format").is_none());
        assert_eq!(v["messages"][0]["role"], "user");
    }

    #[test]
    fn response_content_defaults_to_empty() {
        let r: ChatResponse = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert_eq!(r.content(), "");
        let r: ChatResponse =
            serde_json::from_str(r#"{"message":{"role":"assistant","content":"ok"},"done":true}"#)
                .unwrap();
        assert_eq!(r.content(), "ok");
    }
}
