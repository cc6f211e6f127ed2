//! Error types for bls-mirror

use thiserror::Error;

/// Result type alias for mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Main error type for bls-mirror
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Fetch failure: timeout, DNS, connection refused, non-2xx status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed structured payload (JSON resource, TSV header, population shape)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Object store call failure
    #[error("Store error: {0}")]
    Store(String),

    /// Missing or malformed configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorError {
    /// Stable short name used in per-item failure records
    pub fn kind(&self) -> &'static str {
        match self {
            MirrorError::Transport(_) => "transport",
            MirrorError::Parse(_) => "parse",
            MirrorError::Store(_) => "store",
            MirrorError::Config(_) => "config",
            MirrorError::Serialization(_) => "serialization",
            MirrorError::Io(_) => "io",
        }
    }

    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            MirrorError::Config(_) => 2,
            MirrorError::Transport(_) => 3,
            MirrorError::Store(_) => 4,
            MirrorError::Parse(_) | MirrorError::Serialization(_) => 5,
            MirrorError::Io(_) => 1,
        }
    }
}

impl From<reqwest::Error> for MirrorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MirrorError::Transport(format!("request timed out: {}", e))
        } else {
            MirrorError::Transport(e.to_string())
        }
    }
}
