//! Telegram Bot API alert channel.
//!
//! Uses `sendMessage` to push sensitive-intent alerts to an operator chat.
//! Docs: <https://core.telegram.org/bots/api>

mod send;
pub(crate) mod types;


use vigil_core::config::TelegramConfig;

/// Max bytes per Telegram text message.
pub(crate) const TELEGRAM_MAX_LEN: usize = 4096;

/// Telegram alert channel using the Bot API.
pub struct TelegramAlerter {
    config: TelegramConfig,
    client: reqwest::Client,
    base_url: String,
}

impl TelegramAlerter {
    /// Create a new Telegram alerter from config.
    pub fn new(config: TelegramConfig) -> Self {
        let base_url = format!(
            "{}/bot{}",
            config.base_url.trim_end_matches('/'),
            config.bot_token
        );
        Self {
            config,
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}
