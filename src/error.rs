use std::path::PathBuf;

/// All errors that can occur in the live-score client layer.
#[derive(thiserror::Error, Debug)]
pub enum LiveScoreError {
    /// HTTP request failed (network, DNS, TLS, timeout, etc.).
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// Server returned a non-success HTTP status code.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Failed to read the response body as text.
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        source: reqwest::Error,
    },

    /// The response body was not the JSON shape we expected.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    /// WebSocket transport failure (handshake, read or write).
    #[error("websocket error: {0}")]
    Socket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// The peer sent something that is not valid Engine.IO / Socket.IO framing.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server refused the Socket.IO connect (usually a bad token).
    #[error("connection rejected by server: {0}")]
    ConnectRejected(String),

    /// Reading or writing a persisted value failed.
    #[error("storage io failed for {path}: {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A persisted value could not be (de)serialized.
    #[error("invalid stored value for key {key}: {source}")]
    StorageFormat {
        key: &'static str,
        source: serde_json::Error,
    },
}

impl From<tokio_tungstenite::tungstenite::Error> for LiveScoreError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        LiveScoreError::Socket(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LiveScoreError>;
