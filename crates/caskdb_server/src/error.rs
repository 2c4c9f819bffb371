//! Error types for the request server.

use caskdb_core::CoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the request server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A request line that could not be decoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Engine error.
    #[error("engine error: {0}")]
    Core(#[from] CoreError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking engine task panicked or was cancelled.
    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Invalid server configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ServerError {
    /// Returns true if the client sent something unusable.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServerError::InvalidRequest(_) => true,
            ServerError::Core(err) => matches!(
                err,
                CoreError::EntryTooLarge { .. } | CoreError::InvalidOperation { .. }
            ),
            _ => false,
        }
    }

    /// Returns true if the server failed to carry out a valid request.
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error() && !matches!(self, ServerError::Config(_))
    }
}
