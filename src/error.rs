//! Error types for the protocol monitor.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are
//! grouped by the subsystem that raises them and carry a stable numeric
//! code for external consumers (API envelopes, CLI exit reporting).

use thiserror::Error;

/// Result type alias for protocol monitor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the protocol monitor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Metric Source Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A metric source could not produce a reading
    #[error("Metric source for {protocol} unavailable: {reason}")]
    SourceUnavailable {
        /// Protocol whose source failed
        protocol: String,
        /// Failure details
        reason: String,
    },

    /// A metric source answered with a payload that is not a reading
    #[error("Malformed reading from {protocol}: {reason}")]
    MalformedReading {
        /// Protocol whose source answered
        protocol: String,
        /// Parse failure details
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Storage Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A snapshot already exists for this protocol and timestamp
    #[error("Snapshot for {protocol} at {timestamp} already exists")]
    DuplicateSnapshot {
        /// Protocol name
        protocol: String,
        /// Conflicting timestamp (RFC 3339)
        timestamp: String,
    },

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Lock acquisition failed
    #[error("Failed to acquire lock")]
    Lock,

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Query Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Invalid query parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Configuration Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for an invalid query parameter
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the next ingestion cycle may succeed where this one failed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SourceUnavailable { .. }
                | Error::MalformedReading { .. }
                | Error::DuplicateSnapshot { .. }
                | Error::Storage(_)
                | Error::Lock
        )
    }

    /// Returns true if the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidParameter { .. })
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Source errors: 1xxx
            Error::SourceUnavailable { .. } => 1001,
            Error::MalformedReading { .. } => 1002,

            // Storage errors: 2xxx
            Error::DuplicateSnapshot { .. } => 2001,
            Error::Storage(_) => 2002,
            Error::Lock => 2003,
            Error::Serialization(_) => 2004,
            Error::Deserialization(_) => 2005,

            // Query errors: 3xxx
            Error::InvalidParameter { .. } => 3001,

            // Configuration errors: 4xxx
            Error::Config(_) => 4001,
        }
    }
}
