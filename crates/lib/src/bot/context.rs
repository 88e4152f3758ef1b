//! Per-turn context passed explicitly through the handler call chain.

use crate::channels::{ChannelError, ChannelHandle, RequestContext, Turn};

/// The turn being handled, the request it arrived on, and the channel to reply through.
pub struct TurnContext<'a> {
    pub turn: &'a Turn,
    pub request: &'a RequestContext,
    channel: &'a dyn ChannelHandle,
}

impl<'a> TurnContext<'a> {
    pub fn new(turn: &'a Turn, request: &'a RequestContext, channel: &'a dyn ChannelHandle) -> Self {
        Self {
            turn,
            request,
            channel,
        }
    }

    /// Send text to the turn's conversation.
    pub async fn send_text(&self, text: &str) -> Result<(), ChannelError> {
        self.channel
            .send_message(&self.turn.conversation_id, text)
            .await
    }
}
