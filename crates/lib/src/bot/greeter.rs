//! Welcome newly added conversation members.

use crate::bot::{AssistantBot, TurnContext};
use crate::channels::Participant;
use futures_util::future::join_all;

pub const WELCOME_TEXT: &str = "Hello and welcome to the Azure Pet Store, you can ask me questions about our products, your shopping cart and your order, you can also ask me for information about pet animals. How can I help you?";

/// Outcome of greeting one batch of new members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreetingReport {
    pub sent: usize,
    pub failed: usize,
}

impl AssistantBot {
    /// Send one welcome per added member other than the bot itself. Sends run concurrently;
    /// a failed send is logged and does not affect the others.
    pub async fn on_members_added(
        &self,
        members: &[Participant],
        ctx: &TurnContext<'_>,
    ) -> GreetingReport {
        let recipient_id = ctx.turn.recipient.id.as_str();
        let greetings = members
            .iter()
            .filter(|m| m.id != recipient_id)
            .map(|member| async move { (member, ctx.send_text(WELCOME_TEXT).await) });

        let mut report = GreetingReport::default();
        for (member, res) in join_all(greetings).await {
            match res {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    log::warn!(
                        "turn {}: welcome for member {} failed: {}",
                        ctx.turn.id,
                        member.id,
                        e
                    );
                    report.failed += 1;
                }
            }
        }
        log::debug!(
            "turn {}: greeted {} member(s), {} failed",
            ctx.turn.id,
            report.sent,
            report.failed
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::{FakeClassifier, FakeResponder, RecordingChannel};
    use crate::channels::{RequestContext, Turn};
    use crate::classification::ClassificationResult;
    use std::sync::Arc;

    fn bot() -> AssistantBot {
        AssistantBot::new(
            Arc::new(FakeClassifier::returning(ClassificationResult::default())),
            Arc::new(FakeResponder::replying("unused")),
        )
    }

    fn join_turn() -> Turn {
        Turn::new(
            "test",
            "group-1",
            "",
            Participant::new("a"),
            Participant::new("bot-self"),
        )
    }

    #[tokio::test]
    async fn greets_everyone_except_self() {
        let channel = RecordingChannel::default();
        let turn = join_turn();
        let request = RequestContext::default();
        let ctx = TurnContext::new(&turn, &request, &channel);
        let members = vec![
            Participant::new("bot-self"),
            Participant::new("a"),
            Participant::new("b").with_name("Bea"),
        ];
        let report = bot().on_members_added(&members, &ctx).await;
        assert_eq!(report, GreetingReport { sent: 2, failed: 0 });
        assert_eq!(
            channel.sent_texts(),
            vec![WELCOME_TEXT.to_string(), WELCOME_TEXT.to_string()]
        );
        assert!(channel
            .sent
            .lock()
            .unwrap()
            .iter()
            .all(|(conv, _)| conv == "group-1"));
    }

    #[tokio::test]
    async fn one_failed_greeting_does_not_block_others() {
        let channel = RecordingChannel::failing_on(&[1]);
        let turn = join_turn();
        let request = RequestContext::default();
        let ctx = TurnContext::new(&turn, &request, &channel);
        let members = vec![
            Participant::new("a"),
            Participant::new("b"),
            Participant::new("c"),
        ];
        let report = bot().on_members_added(&members, &ctx).await;
        assert_eq!(report, GreetingReport { sent: 2, failed: 1 });
        assert_eq!(channel.attempt_count(), 3);
        assert_eq!(channel.sent_texts().len(), 2);
    }

    #[tokio::test]
    async fn only_self_added_sends_nothing() {
        let channel = RecordingChannel::default();
        let turn = join_turn();
        let request = RequestContext::default();
        let ctx = TurnContext::new(&turn, &request, &channel);
        let report = bot()
            .on_members_added(&[Participant::new("bot-self")], &ctx)
            .await;
        assert_eq!(report, GreetingReport::default());
        assert_eq!(channel.attempt_count(), 0);
    }
}
