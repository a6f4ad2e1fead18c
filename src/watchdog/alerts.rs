//! Out-of-band alerts for sensitive intents.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vigil_core::{
    message::{ConversationId, IntentTag},
    traits::AlertClient,
};

pub struct AlertDispatcher {
    client: Arc<dyn AlertClient>,
}

impl AlertDispatcher {
    pub fn new(client: Arc<dyn AlertClient>) -> Self {
        Self { client }
    }

    /// Notify on a detached task if any tag is sensitive.
    ///
    /// Not deduplicated. Failures are logged and dropped.
    pub fn maybe_alert(
        &self,
        conversation: &ConversationId,
        text: &str,
        tags: &BTreeSet<IntentTag>,
    ) -> Option<JoinHandle<()>> {
        let sensitive: Vec<IntentTag> = tags.iter().copied().filter(|t| t.is_sensitive()).collect();
        if sensitive.is_empty() {
            return None;
        }

        let body = format_alert(conversation, text, &sensitive);
        let client = self.client.clone();
        let conversation = conversation.clone();
        Some(tokio::spawn(async move {
            match client.notify(&body).await {
                Ok(()) => info!("alerts: {conversation} reported via {}", client.name()),
                Err(e) => warn!("alerts: {conversation} alert via {} failed: {e}", client.name()),
            }
        }))
    }
}

fn format_alert(conversation: &ConversationId, text: &str, tags: &[IntentTag]) -> String {
    let tags = tags
        .iter()
        .map(IntentTag::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "\u{1f6a8} CHAPORT ALERT [{tags}]\n\n\"{text}\"\nvisitorId: {}\nchatId: {}",
        conversation.visitor_id, conversation.chat_id
    )
}
