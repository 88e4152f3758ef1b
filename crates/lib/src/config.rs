//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.petstore-assistant/config.json`) and environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel settings (e.g. Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Classification/completion backend.
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 3978).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    3978
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Per-channel config (e.g. Telegram bot token).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// When set, use webhook mode: Telegram POSTs updates to this URL. If unset, long-poll getUpdates is used.
    pub webhook_url: Option<String>,
    /// Optional secret for webhook verification (X-Telegram-Bot-Api-Secret-Token).
    pub webhook_secret: Option<String>,
}

/// Where classification and completion requests go.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    /// Ollama base URL (default http://127.0.0.1:11434). Overridden by OLLAMA_BASE_URL env.
    pub base_url: Option<String>,
    /// Model name as listed by `ollama list` (default "llama3.2:latest").
    pub model: Option<String>,
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    env_non_empty("TELEGRAM_BOT_TOKEN").or_else(|| trimmed(&config.channels.telegram.bot_token))
}

/// Resolve the completion backend URL: env OLLAMA_BASE_URL overrides config.
pub fn resolve_assistant_base_url(config: &Config) -> String {
    env_non_empty("OLLAMA_BASE_URL")
        .or_else(|| trimmed(&config.assistant.base_url))
        .unwrap_or_else(|| crate::llm::DEFAULT_BASE_URL.to_string())
}

/// Resolve the model name, falling back to the default when unset or blank.
pub fn resolve_assistant_model(config: &Config) -> String {
    trimmed(&config.assistant.model).unwrap_or_else(|| {
        log::debug!("assistant: no model configured, using {}", DEFAULT_MODEL);
        DEFAULT_MODEL.to_string()
    })
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("PETSTORE_ASSISTANT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".petstore-assistant").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Write the default config to `path` unless a file already exists. Returns true when written.
pub fn write_default_config(path: &std::path::Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(&Config::default())?;
    std::fs::write(path, json).with_context(|| format!("writing config to {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("petstore-assistant-config-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 3978);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn parse_camel_case_sections() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 8080 },
                "channels": { "telegram": { "botToken": " 1:abc ", "webhookSecret": "s" } },
                "assistant": { "model": "qwen3:8b" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.bind, "127.0.0.1");
        assert_eq!(config.channels.telegram.webhook_secret.as_deref(), Some("s"));
        assert_eq!(resolve_assistant_model(&config), "qwen3:8b");
    }

    #[test]
    fn blank_model_falls_back_to_default() {
        let mut config = Config::default();
        config.assistant.model = Some("   ".to_string());
        assert_eq!(resolve_assistant_model(&config), DEFAULT_MODEL);
    }

    #[test]
    fn loopback_binds() {
        assert!(is_loopback_bind("127.0.0.1"));
        assert!(is_loopback_bind(" localhost "));
        assert!(!is_loopback_bind("0.0.0.0"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = temp_path("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 3978);
    }

    #[test]
    fn write_default_config_once_then_load() {
        let path = temp_path("config.json");
        assert!(write_default_config(&path).unwrap());
        assert!(!write_default_config(&path).unwrap());
        let (config, _) = load_config(Some(path.clone())).unwrap();
        assert_eq!(config.gateway.bind, "127.0.0.1");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_json_reports_path() {
        let path = temp_path("config.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config(Some(path.clone())).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing config"));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
