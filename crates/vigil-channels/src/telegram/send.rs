//! Alert delivery via `sendMessage` and the `AlertClient` implementation.

use super::types::{TgResponse, TgSentMessage};
use super::{TelegramAlerter, TELEGRAM_MAX_LEN};
use crate::utils::split_message;
use async_trait::async_trait;
use tracing::debug;
use vigil_core::{error::VigilError, traits::AlertClient};

impl TelegramAlerter {
    /// Send a text message to the configured alert chat, chunked to fit.
    pub(crate) async fn send_text(&self, text: &str) -> Result<(), VigilError> {
        for chunk in split_message(text, TELEGRAM_MAX_LEN) {
            let body = serde_json::json!({
                "chat_id": self.config.chat_id,
                "text": chunk,
            });

            let resp = self
                .client
                .post(format!("{}/sendMessage", self.base_url))
                .json(&body)
                .send()
                .await
                .map_err(|e| VigilError::Send(format!("telegram send failed: {e}")))?;

            let status = resp.status();
            let parsed: Option<TgResponse<TgSentMessage>> = resp.json().await.ok();
            match parsed {
                Some(r) if r.ok && status.is_success() => {}
                Some(r) => {
                    return Err(VigilError::Send(format!(
                        "telegram send failed ({status}): {}",
                        r.description.unwrap_or_default()
                    )));
                }
                None => {
                    return Err(VigilError::Send(format!(
                        "telegram send failed ({status}): unreadable response"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl AlertClient for TelegramAlerter {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, text: &str) -> Result<(), VigilError> {
        if !self.is_configured() {
            debug!("telegram: alert channel not configured, skipping alert");
            return Ok(());
        }
        self.send_text(text).await
    }
}
