//! Gateway HTTP server (single port): health probe, Telegram webhook, inbound processor.

use crate::bot::{AssistantBot, TurnContext};
use crate::channels::{
    ActivityKind, ChannelHandle, ChannelRegistry, InboundActivity, RequestContext,
    TelegramChannel, TelegramUpdate,
};
use crate::config::{self, Config};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

const INBOUND_QUEUE: usize = 64;

/// Per-activity tasks in flight; drained during graceful shutdown.
pub type TurnTasks = Arc<tokio::sync::Mutex<JoinSet<()>>>;

/// Shared state for the gateway (config, bot, channels).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub bot: AssistantBot,
    /// Sender for inbound channel activities (e.g. Telegram webhook POSTs). Processor task receives.
    pub inbound_tx: mpsc::Sender<InboundActivity>,
    pub channel_registry: Arc<ChannelRegistry>,
    /// In-process channel connector tasks; awaited during graceful shutdown.
    pub channel_tasks: Arc<tokio::sync::RwLock<Vec<JoinHandle<()>>>>,
    pub turn_tasks: TurnTasks,
    /// Telegram bot user id (recipient of webhook turns). Empty when no token is configured.
    pub telegram_bot_id: String,
}

/// Handle one inbound activity: dispatch to the bot and reply through the originating channel.
async fn process_inbound_activity(state: GatewayState, activity: InboundActivity) {
    let turn = &activity.turn;
    let Some(channel) = state.channel_registry.get(&turn.channel_id).await else {
        log::warn!(
            "inbound: no channel registered for {}, dropping turn {}",
            turn.channel_id,
            turn.id
        );
        return;
    };
    let ctx = TurnContext::new(turn, &activity.request, channel.as_ref());
    match activity.kind {
        ActivityKind::Message => {
            if let Err(e) = state.bot.on_message(&ctx).await {
                log::warn!("inbound: reply for turn {} not delivered: {}", turn.id, e);
            }
        }
        ActivityKind::MembersAdded(ref members) => {
            let report = state.bot.on_members_added(members, &ctx).await;
            if report.failed > 0 {
                log::warn!(
                    "inbound: {} of {} welcome(s) failed in {}",
                    report.failed,
                    report.failed + report.sent,
                    turn.conversation_id
                );
            }
        }
    }
}

/// Run the gateway with the bot built from config. Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let bot = AssistantBot::from_config(&config);
    serve(config, bot).await
}

/// Run the gateway server with the given bot; binds to config.gateway.bind:config.gateway.port.
/// When bind is not loopback, a Telegram webhook secret must be configured or startup fails.
pub async fn serve(config: Config, bot: AssistantBot) -> Result<()> {
    let bind = config.gateway.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) && config.channels.telegram.webhook_secret.is_none() {
        anyhow::bail!(
            "refusing to bind gateway to {} without a webhook secret (set channels.telegram.webhookSecret)",
            bind
        );
    }

    let (inbound_tx, mut inbound_rx) = mpsc::channel::<InboundActivity>(INBOUND_QUEUE);
    let channel_tasks = Arc::new(tokio::sync::RwLock::new(Vec::new()));
    let turn_tasks = TurnTasks::default();
    let telegram_token = config::resolve_telegram_token(&config);
    let telegram = telegram_token.map(|t| Arc::new(TelegramChannel::new(Some(t))));

    let state = GatewayState {
        config: Arc::new(config.clone()),
        bot,
        inbound_tx: inbound_tx.clone(),
        channel_registry: Arc::new(ChannelRegistry::new()),
        channel_tasks: channel_tasks.clone(),
        turn_tasks: turn_tasks.clone(),
        telegram_bot_id: telegram.as_ref().map(|t| t.bot_id()).unwrap_or_default(),
    };

    {
        let state_inbound = state.clone();
        tokio::spawn(async move {
            while let Some(activity) = inbound_rx.recv().await {
                let mut tasks = state_inbound.turn_tasks.lock().await;
                while let Some(res) = tasks.try_join_next() {
                    if let Err(e) = res {
                        log::warn!("inbound: turn task failed: {}", e);
                    }
                }
                tasks.spawn(process_inbound_activity(state_inbound.clone(), activity));
            }
        });
    }

    let webhook_url = config.channels.telegram.webhook_url.clone();
    let telegram_webhook_for_shutdown: Option<Arc<TelegramChannel>> = match telegram {
        Some(telegram) => {
            state
                .channel_registry
                .register(telegram.id().to_string(), telegram.clone())
                .await;
            if let Some(ref url) = webhook_url {
                let secret = config.channels.telegram.webhook_secret.as_deref();
                if let Err(e) = telegram.set_webhook(url, secret).await {
                    log::warn!("telegram set_webhook failed: {}", e);
                } else {
                    log::info!("telegram channel registered (webhook mode): {}", url);
                }
                Some(telegram)
            } else {
                let handle = telegram.start_inbound(inbound_tx);
                state.channel_tasks.write().await.push(handle);
                log::info!("telegram channel registered and getUpdates loop started");
                None
            }
        }
        None => {
            log::info!("no telegram bot token configured; telegram channel disabled");
            None
        }
    };

    let channel_registry = state.channel_registry.clone();
    let app = Router::new()
        .route("/", get(health_http))
        .route("/telegram/webhook", post(telegram_webhook))
        .with_state(state);

    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(
            channel_registry,
            channel_tasks,
            turn_tasks,
            telegram_webhook_for_shutdown,
        ))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Stops channel connectors, removes the Telegram webhook if used, then awaits channel tasks
/// and in-flight turns.
async fn shutdown_signal(
    channel_registry: Arc<ChannelRegistry>,
    channel_tasks: Arc<tokio::sync::RwLock<Vec<JoinHandle<()>>>>,
    turn_tasks: TurnTasks,
    telegram_webhook: Option<Arc<TelegramChannel>>,
) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping channels");

    for id in channel_registry.ids().await {
        if let Some(handle) = channel_registry.get(&id).await {
            handle.stop();
        }
    }

    if let Some(t) = telegram_webhook {
        if let Err(e) = t.delete_webhook().await {
            log::debug!("telegram delete_webhook on shutdown: {}", e);
        }
    }

    let handles = {
        let mut g = channel_tasks.write().await;
        std::mem::take(&mut *g)
    };
    for h in handles {
        let _ = h.await;
    }
    log::info!("channel tasks finished");

    drain_turn_tasks(&turn_tasks).await;
}

/// Await every turn task currently in flight. Returns how many were waited on.
async fn drain_turn_tasks(turn_tasks: &TurnTasks) -> usize {
    let mut set = std::mem::take(&mut *turn_tasks.lock().await);
    let pending = set.len();
    if pending > 0 {
        log::info!("waiting for {} in-flight turn(s)", pending);
    }
    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            log::warn!("turn task failed during shutdown: {}", e);
        }
    }
    pending
}

/// POST /telegram/webhook — receives Telegram update JSON; verifies optional secret, queues activities.
async fn telegram_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.config.channels.telegram.webhook_secret {
        let provided = headers
            .get("X-Telegram-Bot-Api-Secret-Token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            return StatusCode::FORBIDDEN;
        }
    }
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            log::debug!("telegram webhook: invalid update body: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    let request = RequestContext {
        host: headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    for activity in crate::channels::activities_from_update(&update, &state.telegram_bot_id) {
        if state
            .inbound_tx
            .send(activity.with_request(request.clone()))
            .await
            .is_err()
        {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }
    StatusCode::OK
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "channels": state.channel_registry.ids().await,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn drain_waits_for_in_flight_turns() {
        let tasks = TurnTasks::default();
        let finished = Arc::new(AtomicUsize::new(0));
        for i in 0..3u64 {
            let finished = finished.clone();
            tasks.lock().await.spawn(async move {
                tokio::time::sleep(Duration::from_millis(20 + 10 * i)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(drain_turn_tasks(&tasks).await, 3);
        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert!(tasks.lock().await.is_empty());
        assert_eq!(drain_turn_tasks(&tasks).await, 0);
    }
}
