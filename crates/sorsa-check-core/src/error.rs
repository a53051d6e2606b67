//! Error types for the Sorsa Check bot

use thiserror::Error;

/// Result type alias for bot operations
pub type BotResult<T> = Result<T, BotError>;

/// Errors that can escape a job or the transport.
///
/// Per-metric upstream failures never show up here; they are absorbed into
/// [`crate::tweetscout::Fetch::Failed`] by the metrics client.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error("Report render error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
