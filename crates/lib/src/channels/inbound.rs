//! Inbound activity from a channel: delivered to the gateway for bot handling.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// One side of a conversation (user or bot) as seen by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One inbound message and its metadata. Read-only to the bot; dropped when the turn completes.
#[derive(Debug, Clone)]
pub struct Turn {
    /// Unique id for log correlation.
    pub id: String,
    pub channel_id: String,
    pub conversation_id: String,
    pub text: String,
    /// Channel-specific key/value data (e.g. chat type, message id, `sessionid`).
    pub metadata: Map<String, Value>,
    pub from: Participant,
    /// The bot's own identity on this channel.
    pub recipient: Participant,
    pub received_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        text: impl Into<String>,
        from: Participant,
        recipient: Participant,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            text: text.into(),
            metadata: Map::new(),
            from,
            recipient,
            received_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Session id supplied by the channel, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.metadata.get("sessionid").and_then(|v| v.as_str())
    }
}

/// Per-request data that the hosting HTTP layer knows about (e.g. the Host header of a webhook call).
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub host: Option<String>,
}

/// What happened in the conversation.
#[derive(Debug, Clone)]
pub enum ActivityKind {
    /// A user sent text.
    Message,
    /// Participants joined the conversation.
    MembersAdded(Vec<Participant>),
}

/// An activity from a channel to be handled by the bot.
#[derive(Debug, Clone)]
pub struct InboundActivity {
    pub turn: Turn,
    pub kind: ActivityKind,
    pub request: RequestContext,
}

impl InboundActivity {
    pub fn message(turn: Turn) -> Self {
        Self {
            turn,
            kind: ActivityKind::Message,
            request: RequestContext::default(),
        }
    }

    pub fn members_added(turn: Turn, members: Vec<Participant>) -> Self {
        Self {
            turn,
            kind: ActivityKind::MembersAdded(members),
            request: RequestContext::default(),
        }
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }
}
