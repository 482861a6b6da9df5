use std::fmt;

use thiserror::Error;

/// The result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by consensus and execution client capabilities.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// The response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The requested block, state or validator does not exist (yet).
    #[error("not found: {0}")]
    NotFound(String),

    /// The request failed in transit (connection, timeout, status).
    #[error("request failed: {0}")]
    Request(String),

    /// The node is up but cannot serve the query (syncing, restarting).
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Creates a request error.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Creates a not-found error.
    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }
}
