use thiserror::Error;

/// Top-level error type for Vigil.
///
/// A conversation with no resolvable identity is not an error: the
/// reconciler simply yields nothing for it.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Resolving a referenced resource or listing chat events failed.
    #[error("upstream fetch failed: {0}")]
    Upstream(String),

    /// An outbound reply or alert could not be delivered.
    #[error("send failed: {0}")]
    Send(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
