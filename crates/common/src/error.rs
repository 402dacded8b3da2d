//! Common error types for vipd components.
//!
//! The process is fail-fast: apart from campaign cancellation (which is an
//! outcome, not an error) every variant here is fatal and handled by a
//! single top-level handler in the binary.

use std::fmt;

/// A specialized Result type for vipd operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for vipd operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid VIP syntax, unresolvable interface, unreadable credentials.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session, connection, or campaign failure against etcd.
    #[error("Coordination error: {0}")]
    Coordination(String),

    /// Failure observing or mutating the kernel address table.
    #[error("Network error: {0}")]
    Network(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new coordination error.
    pub fn coordination(msg: impl fmt::Display) -> Self {
        Error::Coordination(msg.to_string())
    }

    /// Create a new network error.
    pub fn network(msg: impl fmt::Display) -> Self {
        Error::Network(msg.to_string())
    }
}
