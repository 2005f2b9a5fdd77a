//! Parser error types

use thiserror::Error;

use crate::tree::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Node {0} is not in the registry")]
    UnknownNode(NodeId),

    #[error("Token span {start}..{end} is outside the source text (length {len})")]
    SpanOutOfBounds { start: usize, end: usize, len: usize },

    #[error("Structural error: {0}")]
    Structural(String),
}

/// Rejection from the position oracle. Not an error for the parser as a
/// whole: it only removes a node from the candidate set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IllegalMove {
    #[error("'{0}' is not valid SAN")]
    Syntax(String),

    #[error("'{0}' is not legal in this position")]
    Illegal(String),
}
