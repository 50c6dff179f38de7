//! Error types for the TicketChain library

use thiserror::Error;

/// Result type alias for TicketChain operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Main error type for ledger and node operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A request payload was missing a required field or carried a bad value
    #[error("Malformed request: missing or invalid field `{field}`")]
    MalformedRequest { field: String },

    /// No ticket record exists on chain for the tracker
    #[error("Ticket not found: {tracker}")]
    TicketNotFound { tracker: String },

    /// The seller named in a purchase is not the ticket's current owner
    #[error("Ticket {tracker} is owned by {actual}, not {expected}")]
    OwnershipMismatch {
        tracker: String,
        expected: String,
        actual: String,
    },

    /// Tracker already present on chain or pending (only with unique trackers)
    #[error("Ticket {tracker} has already been issued")]
    TicketAlreadyIssued { tracker: String },

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Network-specific error types
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Peer could not be reached or did not answer
    #[error("Peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    /// Peer answered with a chain that failed validation
    #[error("Peer {peer} reported an invalid chain: {reason}")]
    PeerInvalidChain { peer: String, reason: String },

    /// Address could not be normalized to host:port
    #[error("Invalid peer address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Timeout occurred
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Invalid message format
    #[error("Invalid message format: {reason}")]
    InvalidMessage { reason: String },

    /// Remote side closed the connection before answering
    #[error("Connection closed by {peer}")]
    ConnectionClosed { peer: String },
}

/// Serialization error types
#[derive(Error, Debug)]
pub enum SerializationError {
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl LedgerError {
    /// Create a malformed request error for the named field
    pub fn malformed<T: Into<String>>(field: T) -> Self {
        LedgerError::MalformedRequest {
            field: field.into(),
        }
    }

    /// Create a configuration error
    pub fn config<T: Into<String>>(msg: T) -> Self {
        LedgerError::Config(msg.into())
    }

    /// True for errors produced by rejecting a caller's request
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::MalformedRequest { .. }
                | LedgerError::TicketNotFound { .. }
                | LedgerError::OwnershipMismatch { .. }
                | LedgerError::TicketAlreadyIssued { .. }
        )
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(SerializationError::Json(err))
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Serialization(SerializationError::Toml(err))
    }
}

impl From<tokio_util::codec::LinesCodecError> for LedgerError {
    fn from(err: tokio_util::codec::LinesCodecError) -> Self {
        match err {
            tokio_util::codec::LinesCodecError::Io(e) => LedgerError::Io(e),
            other => LedgerError::Network(NetworkError::InvalidMessage {
                reason: other.to_string(),
            }),
        }
    }
}
