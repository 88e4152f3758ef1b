//! Communication channels (Telegram, console).
//!
//! Channel trait and registry so the gateway can start/stop channel connectors
//! and deliver replies. Inbound activities are sent to the gateway for bot handling.

mod console;
mod error;
mod inbound;
mod registry;
mod telegram;

pub use console::ConsoleChannel;
pub use error::ChannelError;
pub use inbound::{ActivityKind, InboundActivity, Participant, RequestContext, Turn};
pub use registry::{ChannelHandle, ChannelRegistry};
pub use telegram::{activities_from_update, bot_id_from_token, TelegramChannel, TelegramUpdate};
