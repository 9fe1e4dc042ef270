//! Error types for the execution engine

use srnn_model::ModelError;
use thiserror::Error;

/// Result type for solve operations
pub type Result<T> = std::result::Result<T, SolveError>;

/// Errors that can occur while executing a compiled plan
#[derive(Error, Debug)]
pub enum SolveError {
    /// The supplied input or a reference resolved from it is out of range
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Reason the input was rejected
        reason: String,
    },

    /// A past read beyond the retained memory depth
    #[error("Ringbuffer index out of bounds: past index {past_index} with memory depth {memory_depth}")]
    OutOfBounds {
        /// Requested past index
        past_index: u32,
        /// Retained memory depth
        memory_depth: u32,
    },

    /// A compiled tile violates its structural invariants
    #[error("Malformed tile: {reason}")]
    MalformedTile {
        /// Violated invariant
        reason: String,
    },

    /// Invalid configuration supplied to the engine
    #[error("Configuration error: {0}")]
    Config(#[from] ModelError),
}

impl SolveError {
    /// Create an invalid-input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create a malformed-tile error
    pub fn malformed_tile(reason: impl Into<String>) -> Self {
        Self::MalformedTile {
            reason: reason.into(),
        }
    }
}
