//! Error taxonomy shared by every codec.

use thiserror::Error;

use crate::config::Algorithm;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// The buffer owner could not satisfy a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("allocation of {requested} bytes failed ({allocated} bytes already handed out, limit {limit:?})")]
pub struct AllocationError {
    pub requested: usize,
    pub allocated: usize,
    pub limit: Option<usize>,
}

/// Failure modes of a codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The library rejected construction parameters or could not set up its state.
    #[error("{algorithm} initialization failed: {message}")]
    Initialization {
        algorithm: Algorithm,
        message: String,
    },

    /// `process_block` was called before `init` succeeded, or after `release`.
    #[error("{algorithm} codec used before initialization")]
    NotInitialized { algorithm: Algorithm },

    /// Input is not valid compressed data for this algorithm.
    #[error("{algorithm} decode error: {message}")]
    Decode {
        algorithm: Algorithm,
        message: String,
    },

    /// The library ran out of output space even though the buffer was sized
    /// to its own worst-case bound.
    #[error("{algorithm} output exceeded its computed bound of {bound} bytes")]
    SizingDefect { algorithm: Algorithm, bound: usize },

    /// The format cannot represent a block of this size.
    #[error("{algorithm} cannot process a {len}-byte block")]
    InputTooLarge { algorithm: Algorithm, len: usize },

    /// The library failed for a reason unrelated to the input bytes.
    #[error("{algorithm} library error: {message}")]
    Library {
        algorithm: Algorithm,
        message: String,
    },

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("invalid codec configuration: {0}")]
    InvalidConfig(String),
}

impl CodecError {
    pub fn initialization(algorithm: Algorithm, message: impl Into<String>) -> Self {
        CodecError::Initialization {
            algorithm,
            message: message.into(),
        }
    }

    pub fn decode(algorithm: Algorithm, message: impl Into<String>) -> Self {
        CodecError::Decode {
            algorithm,
            message: message.into(),
        }
    }

    pub fn library(algorithm: Algorithm, message: impl Into<String>) -> Self {
        CodecError::Library {
            algorithm,
            message: message.into(),
        }
    }

    /// True for corrupt, truncated or mismatched input.
    pub fn is_decode(&self) -> bool {
        matches!(self, CodecError::Decode { .. })
    }

    /// True when a bound computation was wrong. Always a bug, never bad data.
    pub fn is_sizing_defect(&self) -> bool {
        matches!(self, CodecError::SizingDefect { .. })
    }
}
