// Error types for the live data path
//
// Every variant is recoverable: transport errors lead to a reconnect,
// snapshot errors to a status message, parse errors to a dropped message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WallError>;

#[derive(Debug, Error)]
pub enum WallError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Snapshot request failed (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for WallError {
    fn from(err: reqwest::Error) -> Self {
        WallError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for WallError {
    fn from(err: serde_json::Error) -> Self {
        WallError::Parse(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for WallError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        WallError::Transport(err.to_string())
    }
}
