//! Gateway: HTTP server hosting channel webhooks and the inbound activity processor.
//!
//! Channels push [`crate::channels::InboundActivity`] values into one queue; each activity is
//! handled by the bot in its own task and replies go back through the originating channel.

mod server;

pub use server::{run_gateway, serve, GatewayState};
