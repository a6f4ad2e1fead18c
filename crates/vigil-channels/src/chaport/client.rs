//! `ChatClient` implementation over the Chaport REST API.

use super::{message_body, ChaportClient};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use vigil_core::{
    error::VigilError,
    message::ConversationId,
    payload::event_list,
    traits::{ChatClient, Delivery},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
impl ChatClient for ChaportClient {
    fn name(&self) -> &str {
        "chaport"
    }

    async fn send_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<Delivery, VigilError> {
        if !self.is_configured() {
            warn!("chaport: no api_token, dry run for reply to {conversation}: {text}");
            return Ok(Delivery::DryRun);
        }

        let resp = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.config.api_token)
            .json(&message_body(conversation, text))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| VigilError::Send(format!("chaport send failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(VigilError::Send(format!(
                "chaport send failed ({status}): {error_text}"
            )));
        }

        info!("chaport: reply delivered to {conversation}");
        Ok(Delivery::Sent)
    }

    async fn fetch_resource(&self, path: &str) -> Result<Value, VigilError> {
        if !self.is_configured() {
            return Err(VigilError::Upstream(
                "chaport api_token not configured".into(),
            ));
        }

        let Some(url) = self.resource_url(path) else {
            return Err(VigilError::Upstream(format!(
                "chaport: refusing non-relative resource {path}"
            )));
        };
        debug!("chaport: fetching {url}");
        get_json(self, &url).await
    }

    async fn list_events(&self, conversation: &ConversationId) -> Result<Vec<Value>, VigilError> {
        if !self.is_configured() {
            return Err(VigilError::Upstream(
                "chaport api_token not configured".into(),
            ));
        }

        let body = get_json(self, &self.events_url(conversation)).await?;
        event_list(&body).cloned().ok_or_else(|| {
            VigilError::Upstream(format!("chaport: no event list for {conversation}"))
        })
    }
}

async fn get_json(chaport: &ChaportClient, url: &str) -> Result<Value, VigilError> {
    let resp = chaport
        .client
        .get(url)
        .bearer_auth(&chaport.config.api_token)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await
        .map_err(|e| VigilError::Upstream(format!("chaport GET {url} failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let error_text = resp.text().await.unwrap_or_default();
        return Err(VigilError::Upstream(format!(
            "chaport GET {url} failed ({status}): {error_text}"
        )));
    }

    resp.json()
        .await
        .map_err(|e| VigilError::Upstream(format!("chaport GET {url} parse failed: {e}")))
}
