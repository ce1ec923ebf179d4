use thiserror::Error;

/// Errors surfaced by the streaming and HTTP data paths.
///
/// Both transports report through the same variants so callers never need to
/// know which one served a call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Operation attempted while the connection is not open
    #[error("not connected")]
    NotConnected,

    /// No reply within the configured window
    #[error("timed out after {timeout_ms}ms: {context}")]
    Timeout { timeout_ms: u64, context: String },

    /// The server reported a failure
    #[error("server error: {0}")]
    Application(String),

    /// A frame or body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// The underlying connection failed
    #[error("transport error: {0}")]
    Transport(String),

    /// The configured server address is unusable
    #[error("invalid server url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ClientError {
    /// Whether another transport might succeed where this one failed
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::Timeout { .. } | Self::Transport(_)
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
