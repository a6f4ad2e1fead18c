mod api;
mod watchdog;

use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use vigil_channels::{chaport::ChaportClient, telegram::TelegramAlerter};
use vigil_core::{
    config::{self, Config},
    traits::{AlertClient, ChatClient},
};
use watchdog::{KeywordClassifier, Watchdog};

#[derive(Parser)]
#[command(
    name = "vigil",
    version,
    about = "Vigil: auto-reply watchdog for Chaport live chat"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server and watchdog.
    Start,
    /// Show which integrations are configured.
    Status,
    /// Print the intent tags a message would get.
    Classify {
        /// The message text.
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
/// The returned guard must live as long as file logging is needed.
fn init_logging(cfg: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.vigil.log_level));

    if cfg.vigil.log_file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    }

    let path = Path::new(&cfg.vigil.log_file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("log_file '{}' has no file name", cfg.vigil.log_file))?;
    std::fs::create_dir_all(dir)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        dir, file_name,
    ));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;
            let _log_guard = init_logging(&cfg)?;

            let chaport = ChaportClient::new(cfg.chaport.clone());
            if !chaport.is_configured() {
                tracing::warn!("chaport api_token is empty: replies will be logged, not sent");
            }
            let telegram = TelegramAlerter::new(cfg.telegram.clone());
            if !telegram.is_configured() {
                tracing::warn!("telegram bot_token/chat_id missing: alerts disabled");
            }
            let chat: Arc<dyn ChatClient> = Arc::new(chaport);
            let alert: Arc<dyn AlertClient> = Arc::new(telegram);

            let watchdog = Arc::new(Watchdog::new(&cfg, chat, alert));
            info!(
                "{} starting | intent delay {}s | fallback delay {}s",
                cfg.vigil.name, cfg.watchdog.intent_delay_secs, cfg.watchdog.fallback_delay_secs
            );

            api::serve(&cfg.api, watchdog, async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received");
                }
            })
            .await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("{} status\n", cfg.vigil.name);
            println!(
                "Config: {}{}",
                cli.config,
                if Path::new(&cli.config).exists() {
                    ""
                } else {
                    " (not found, using defaults)"
                }
            );
            println!("Listen: {}:{}", cfg.api.host, cfg.api.port);
            println!();
            println!(
                "  chaport:        {}",
                if cfg.chaport.api_token.is_empty() {
                    "missing api_token (dry run)"
                } else {
                    "configured"
                }
            );
            println!(
                "  telegram:       {}",
                if cfg.telegram.is_configured() {
                    "configured"
                } else {
                    "not configured"
                }
            );
            println!(
                "  webhook secret: {}",
                if cfg.api.webhook_secret.is_empty() {
                    "disabled"
                } else {
                    "enforced"
                }
            );
            println!(
                "  timers:         intent {}s, fallback {}s, poll {}x{}s",
                cfg.watchdog.intent_delay_secs,
                cfg.watchdog.fallback_delay_secs,
                cfg.watchdog.poll_attempts,
                cfg.watchdog.poll_interval_secs
            );
        }
        Commands::Classify { text } => {
            if text.is_empty() {
                anyhow::bail!("no text provided. Usage: vigil classify <text>");
            }
            let cfg = config::load(&cli.config)?;
            let tags = KeywordClassifier::new(&cfg.keywords).classify(&text.join(" "));
            if tags.is_empty() {
                println!("(no intent)");
            } else {
                let names: Vec<&str> = tags.iter().map(|t| t.as_str()).collect();
                println!("{}", names.join(", "));
            }
        }
    }

    Ok(())
}
