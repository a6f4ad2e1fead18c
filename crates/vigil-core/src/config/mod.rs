mod defaults;


use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::VigilError;
use defaults::*;

/// Top-level Vigil configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vigil: VigilConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chaport: ChaportConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stdout.
    #[serde(default)]
    pub log_file: String,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

/// Inbound HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Shared secret expected in `x-webhook-secret`. Empty = no check.
    #[serde(default)]
    pub webhook_secret: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            webhook_secret: String::new(),
        }
    }
}

/// Chaport REST API config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaportConfig {
    #[serde(default = "default_chaport_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: String,
}

impl Default for ChaportConfig {
    fn default() -> Self {
        Self {
            base_url: default_chaport_base_url(),
            api_token: String::new(),
        }
    }
}

/// Telegram alert channel config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub bot_token: String,
    /// Chat (user, group, or channel) that receives alerts.
    #[serde(default)]
    pub chat_id: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            base_url: default_telegram_base_url(),
            bot_token: String::new(),
            chat_id: String::new(),
        }
    }
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

/// Reply timers and the indirection polling bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_intent_delay")]
    pub intent_delay_secs: u64,
    #[serde(default = "default_fallback_delay")]
    pub fallback_delay_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    #[serde(default = "default_deposit_reply")]
    pub deposit_reply: String,
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            intent_delay_secs: default_intent_delay(),
            fallback_delay_secs: default_fallback_delay(),
            poll_interval_secs: default_poll_interval(),
            poll_attempts: default_poll_attempts(),
            deposit_reply: default_deposit_reply(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

impl WatchdogConfig {
    pub fn intent_delay(&self) -> Duration {
        Duration::from_secs(self.intent_delay_secs)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_secs(self.fallback_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Keyword lists per intent tag. Matching is case-insensitive containment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default = "default_deposit_keywords")]
    pub deposit: Vec<String>,
    #[serde(default = "default_register_keywords")]
    pub register: Vec<String>,
    #[serde(default = "default_reset_keywords")]
    pub reset: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            deposit: default_deposit_keywords(),
            register: default_register_keywords(),
            reset: default_reset_keywords(),
        }
    }
}

/// Candidate field paths, tried in order, for each extracted field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_visitor_id_paths")]
    pub visitor_id: Vec<String>,
    #[serde(default = "default_chat_id_paths")]
    pub chat_id: Vec<String>,
    #[serde(default = "default_text_paths")]
    pub text: Vec<String>,
    #[serde(default = "default_event_id_paths")]
    pub event_id: Vec<String>,
    #[serde(default = "default_timestamp_paths")]
    pub timestamp: Vec<String>,
    #[serde(default = "default_author_paths")]
    pub author: Vec<String>,
    /// Where an indirection payload keeps its resource path.
    #[serde(default = "default_reference_paths")]
    pub reference: Vec<String>,
    /// Chat id inside a fetched resource.
    #[serde(default = "default_resource_chat_id_paths")]
    pub resource_chat_id: Vec<String>,
    #[serde(default = "default_event_type_paths")]
    pub event_type: Vec<String>,
    #[serde(default = "default_event_text_paths")]
    pub event_text: Vec<String>,
    #[serde(default = "default_event_key_paths")]
    pub event_key: Vec<String>,
    #[serde(default = "default_event_timestamp_paths")]
    pub event_timestamp: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            visitor_id: default_visitor_id_paths(),
            chat_id: default_chat_id_paths(),
            text: default_text_paths(),
            event_id: default_event_id_paths(),
            timestamp: default_timestamp_paths(),
            author: default_author_paths(),
            reference: default_reference_paths(),
            resource_chat_id: default_resource_chat_id_paths(),
            event_type: default_event_type_paths(),
            event_text: default_event_text_paths(),
            event_key: default_event_key_paths(),
            event_timestamp: default_event_timestamp_paths(),
        }
    }
}

impl Config {
    /// Overlay secrets and the listen port from the environment.
    ///
    /// Only non-empty values override what the file says.
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("CHAPORT_TOKEN") {
            self.chaport.api_token = token;
        }
        if let Some(token) = non_empty("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = non_empty("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = chat_id;
        }
        if let Some(secret) = non_empty("WEBHOOK_SECRET") {
            self.api.webhook_secret = secret;
        }
        if let Some(port) = non_empty("PORT") {
            match port.trim().parse() {
                Ok(p) => self.api.port = p,
                Err(e) => tracing::warn!("ignoring invalid PORT '{port}': {e}"),
            }
        }
    }
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, VigilError> {
    let mut config = parse_file(Path::new(path))?;
    config.apply_env_overrides(|name| std::env::var(name).ok());
    Ok(config)
}

fn parse_file(path: &Path) -> Result<Config, VigilError> {
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| VigilError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    toml::from_str(&content).map_err(|e| VigilError::Config(format!("failed to parse config: {e}")))
}
