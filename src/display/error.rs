//! Error types for Frame TV transport calls

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot read token file: {0}")]
    TokenFile(#[from] std::io::Error),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Channel closed before a reply arrived")]
    ChannelClosed,

    #[error("TV reported an error: {0}")]
    Channel(String),

    #[error("Missing field in reply: {0}")]
    MissingField(&'static str),
}
