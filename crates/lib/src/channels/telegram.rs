//! Telegram channel: long-poll getUpdates (or webhook) and sendMessage via Bot API.

use crate::channels::inbound::{InboundActivity, Participant, Turn};
use crate::channels::registry::ChannelHandle;
use crate::channels::ChannelError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT: u64 = 30;
pub(crate) const TELEGRAM_CHANNEL_ID: &str = "telegram";

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

/// Telegram update payload (getUpdates result item or webhook POST body).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    #[serde(default)]
    pub message_id: i64,
    pub chat: TelegramChat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub new_chat_members: Vec<TelegramUser>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub typ: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl From<&TelegramUser> for Participant {
    fn from(u: &TelegramUser) -> Self {
        Participant {
            id: u.id.to_string(),
            name: u.username.clone().or_else(|| u.first_name.clone()),
        }
    }
}

/// Bot user id: the numeric part of the token before the colon (e.g. `123456:ABC...`).
pub fn bot_id_from_token(token: &str) -> Option<String> {
    let (id, _) = token.trim().split_once(':')?;
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

/// Turn a Telegram update into bot activities. A message may carry both joined members and text.
pub fn activities_from_update(update: &TelegramUpdate, bot_id: &str) -> Vec<InboundActivity> {
    let Some(ref msg) = update.message else {
        return Vec::new();
    };
    let recipient = Participant::new(bot_id);
    let from = msg
        .from
        .as_ref()
        .map(Participant::from)
        .unwrap_or_else(|| Participant::new(msg.chat.id.to_string()));
    let base_turn = |text: &str| {
        let mut turn = Turn::new(
            TELEGRAM_CHANNEL_ID,
            msg.chat.id.to_string(),
            text,
            from.clone(),
            recipient.clone(),
        )
        .with_metadata("updateId", update.update_id)
        .with_metadata("messageId", msg.message_id);
        if let Some(ref typ) = msg.chat.typ {
            turn = turn.with_metadata("chatType", typ.as_str());
        }
        turn
    };

    let mut out = Vec::new();
    if !msg.new_chat_members.is_empty() {
        let members = msg.new_chat_members.iter().map(Participant::from).collect();
        out.push(InboundActivity::members_added(base_turn(""), members));
    }
    if let Some(ref text) = msg.text {
        out.push(InboundActivity::message(base_turn(text)));
    }
    out
}

/// Telegram channel connector: long-polls for updates and sends replies via sendMessage.
pub struct TelegramChannel {
    id: String,
    token: Option<String>,
    api_base: String,
    running: AtomicBool,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: Option<String>) -> Self {
        Self {
            id: TELEGRAM_CHANNEL_ID.to_string(),
            token,
            api_base: telegram_api_base(),
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn token(&self) -> Result<&str, ChannelError> {
        self.token
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured("telegram bot token".to_string()))
    }

    /// The bot's own user id, used as the recipient of every turn.
    pub fn bot_id(&self) -> String {
        self.token
            .as_deref()
            .and_then(bot_id_from_token)
            .unwrap_or_default()
    }

    /// Start the getUpdates long-poll loop and forward activities to the gateway. Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<InboundActivity>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, inbound_tx).await;
        })
    }

    /// Call Telegram getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), ChannelError> {
        let token = self.token()?;
        let mut url = format!(
            "{}/bot{}/getUpdates?timeout={}",
            self.api_base, token, LONG_POLL_TIMEOUT
        );
        if let Some(off) = offset {
            url = format!("{}&offset={}", url, off);
        }
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("getUpdates failed: {} {}", status, body)));
        }
        let data: GetUpdatesResponse = res.json().await?;
        if !data.ok {
            return Err(ChannelError::Api("getUpdates returned ok: false".to_string()));
        }
        let next_offset = data
            .result
            .iter()
            .map(|u| u.update_id)
            .max()
            .map(|id| id + 1);
        Ok((data.result, next_offset))
    }

    async fn post_api(&self, method: &str, body: &serde_json::Value) -> Result<(), ChannelError> {
        let token = self.token()?;
        let url = format!("{}/bot{}/{}", self.api_base, token, method);
        let res = self.client.post(&url).json(body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("{} failed: {} {}", method, status, body)));
        }
        Ok(())
    }

    /// Set webhook URL (and optional secret). When set, Telegram POSTs updates to the URL instead of getUpdates.
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({ "url": url });
        if let Some(s) = secret {
            body["secret_token"] = serde_json::Value::String(s.to_string());
        }
        self.post_api("setWebhook", &body).await
    }

    /// Remove webhook so the bot can use getUpdates again.
    pub async fn delete_webhook(&self) -> Result<(), ChannelError> {
        self.post_api("deleteWebhook", &serde_json::json!({})).await
    }

    /// Send a text message to a chat via sendMessage API.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        self.post_api("sendMessage", &body).await
    }
}

async fn run_get_updates_loop(
    channel: Arc<TelegramChannel>,
    inbound_tx: mpsc::Sender<InboundActivity>,
) {
    let bot_id = channel.bot_id();
    let mut offset: Option<i64> = None;
    while channel.running() {
        match channel.get_updates(offset).await {
            Ok((updates, next)) => {
                offset = next;
                for u in updates {
                    for activity in activities_from_update(&u, &bot_id) {
                        if inbound_tx.send(activity).await.is_err() {
                            log::debug!("telegram: inbound channel closed, stopping loop");
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                log::debug!("telegram getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl ChannelHandle for TelegramChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), ChannelError> {
        TelegramChannel::send_message(self, conversation_id, text).await
    }
}

/// Resolve Telegram bot API base URL (TELEGRAM_API_BASE env, for tests or custom endpoints).
pub fn telegram_api_base() -> String {
    std::env::var("TELEGRAM_API_BASE")
        .ok()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| TELEGRAM_API_BASE.to_string())
}
