use crate::{error::VigilError, message::ConversationId};
use async_trait::async_trait;
use serde_json::Value;

/// What became of an outbound message that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The client is not configured to deliver; the message was only logged.
    DryRun,
}

/// Chat platform client: where visitors talk and auto-replies go.
///
/// Sends are not idempotent; the watchdog's ledger is the only thing standing
/// between a retry and a duplicate reply.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Human-readable platform name.
    fn name(&self) -> &str;

    /// Post a text message into a conversation.
    async fn send_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<Delivery, VigilError>;

    /// Fetch a resource referenced by an inbound event. `path` is relative to
    /// the platform's API base; anything else is refused.
    async fn fetch_resource(&self, path: &str) -> Result<Value, VigilError>;

    /// List the raw events of a conversation, oldest first.
    async fn list_events(&self, conversation: &ConversationId) -> Result<Vec<Value>, VigilError>;
}

/// Out-of-band alert channel for humans (e.g. a Telegram group).
#[async_trait]
pub trait AlertClient: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Deliver an alert. Best effort; callers only log failures.
    async fn notify(&self, text: &str) -> Result<(), VigilError>;
}
