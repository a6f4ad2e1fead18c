//! Chaport REST API client.
//!
//! Posts auto-replies into visitor chats and resolves the resource paths
//! that webhook events point at.
//! Docs: <https://www.chaport.com/api>

mod client;


use crate::utils::join_url;
use serde_json::{json, Value};
use vigil_core::{config::ChaportConfig, message::ConversationId, payload::is_relative_path};

/// Chaport client authenticated with a bearer API token.
pub struct ChaportClient {
    config: ChaportConfig,
    client: reqwest::Client,
}

impl ChaportClient {
    /// Create a new Chaport client from config.
    pub fn new(config: ChaportConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_token.is_empty()
    }

    fn messages_url(&self) -> String {
        join_url(&self.config.base_url, "/api/v1/messages")
    }

    fn events_url(&self, conversation: &ConversationId) -> String {
        join_url(
            &self.config.base_url,
            &format!(
                "/api/v1/visitors/{}/chats/{}/events",
                conversation.visitor_id, conversation.chat_id
            ),
        )
    }

    /// Absolute URL for a referenced resource. `None` for anything that names
    /// its own scheme or host, so the token never leaves the configured API.
    fn resource_url(&self, path: &str) -> Option<String> {
        is_relative_path(path).then(|| join_url(&self.config.base_url, path))
    }
}

/// JSON body for `POST /api/v1/messages`.
pub(crate) fn message_body(conversation: &ConversationId, text: &str) -> Value {
    json!({
        "visitor": { "id": conversation.visitor_id },
        "chat": { "id": conversation.chat_id },
        "message": { "text": text },
    })
}
