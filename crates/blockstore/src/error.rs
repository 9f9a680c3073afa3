//! Error type shared by transports, the connection manager and the consumer.

use thiserror::Error;

/// Boxed error returned by caller-supplied capabilities (processors, reporters).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = BlockStoreError> = std::result::Result<T, E>;

/// Every failure the client can surface. Kinds stay distinct so callers can branch on them.
#[derive(Debug, Error)]
pub enum BlockStoreError {
    /// Network-level failure (connection reset, refused, HTTP/2 error, ...).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// Method name has no HTTP route.
    #[error("unsupported method {0}")]
    UnsupportedMethod(String),
    #[error("encode error: {0}")]
    Encode(String),
    /// Reply body could not be decoded as the expected message.
    #[error("decode error: {0}")]
    Decode(String),
    /// The remote service reported a failure.
    #[error("remote error: {0}")]
    Remote(String),
    #[error("block processor failed: {0}")]
    Processor(#[source] BoxError),
    #[error("progress reporter failed: {0}")]
    Reporter(#[source] BoxError),
    /// Dialing the block store failed. Not cached; the next call dials again.
    #[error("failed to connect to block store: {0}")]
    Connection(String),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for BlockStoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl From<tonic::transport::Error> for BlockStoreError {
    fn from(err: tonic::transport::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl From<tonic::Status> for BlockStoreError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::Cancelled => Self::Cancelled,
            tonic::Code::Unavailable => Self::Transport(Box::new(status)),
            _ => Self::Remote(status.message().to_string()),
        }
    }
}
