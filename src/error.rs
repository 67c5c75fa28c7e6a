use thiserror::Error;

use crate::events::CloseReason;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the gateway.
#[derive(Error, Debug)]
pub enum Error {
    #[error("connection: {0}")]
    Connection(#[from] ConnectionError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("send: {0}")]
    Send(#[from] SendError),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Connection-level errors reported by the messaging-client boundary.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("not connected")]
    Disconnected,

    #[error("connection closed: {0}")]
    Closed(CloseReason),

    #[error("logged out, session must be re-paired")]
    LoggedOut,
}

/// Credential store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("save failed: {0}")]
    Save(String),

    #[error("load failed: {0}")]
    Load(String),
}

/// Outbound send errors, surfaced to HTTP callers.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not connected, scan the pairing code first")]
    NotReady,

    #[error("timed out waiting for delivery")]
    Timeout,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl SendError {
    /// Stable kind string used in HTTP error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::NotReady => "NotReady",
            Self::Timeout => "Timeout",
            Self::Delivery(_) => "Delivery",
        }
    }

    /// Validation and readiness errors are the caller's fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotReady)
    }
}
