//! Error types for the wrapindex pipeline.

use thiserror::Error;

/// Errors that can occur during indexing.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Returns `true` for infrastructure errors that are worth retrying
    /// (the RPC endpoint was unreachable, timed out, or returned garbage).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

/// A single log entry that could not be decoded into a known event.
///
/// Always names the field that failed so the skip can be logged usefully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("log has no topics")]
    NoTopics,

    #[error("missing indexed topic for field `{field}`")]
    MissingTopic { field: &'static str },

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl DecodeError {
    /// Name of the field that failed to decode.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NoTopics => "topics",
            Self::MissingTopic { field } | Self::InvalidField { field, .. } => field,
        }
    }
}
