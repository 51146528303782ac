//! Error types for the Packrat driver
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Every variant is `Clone`: a connection failure captured during setup is
//! replayed to every queued operation and to every later caller, so the
//! driver hands out copies of the same error.

use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Packrat driver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid or unreachable connection parameters. Fatal to the driver
    /// instance; reported to every pending and subsequent caller.
    #[error("configuration error [{host}:{port}]: {reason}")]
    Configuration {
        /// Configured store host
        host: String,
        /// Configured store port
        port: u16,
        /// Underlying failure description
        reason: String,
    },

    /// A required option is missing on a specific call
    #[error("{operation}: '{field}' is missing")]
    Validation {
        /// Operation that rejected the call
        operation: &'static str,
        /// Name of the missing option
        field: &'static str,
    },

    /// A scalar string id that does not parse as a canonical id
    #[error("invalid document id: '{0}'")]
    InvalidId(String),

    /// Failure surfaced by the underlying store during a dispatched
    /// operation; passed through to the caller unmodified
    #[error("store error: {0}")]
    Store(String),

    /// Cache backend failure. Never a veto path: reads fall through to the
    /// store, writes log and proceed.
    #[error("cache backend error: {0}")]
    Cache(String),

    /// Caller-level contract violation on the model adapter surface
    #[error("adapter error: {0}")]
    Adapter(String),
}
