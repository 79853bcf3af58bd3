//! Error types for the separation driver

use thiserror::Error;

/// Separation error types
#[derive(Error, Debug)]
pub enum SepError {
    /// Invalid driver configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Extraction offset outside the signal
    #[error("Segment offset {offset} out of range for signal of {total} samples")]
    OffsetOutOfRange { offset: usize, total: usize },

    /// Model file not found
    #[error("Model not found: {path}")]
    ModelNotFound { path: String },

    /// Engine call failed
    #[error("Inference failed: {reason}")]
    InferenceFailed { reason: String },

    /// Engine produced fewer valid samples than one segment
    #[error("Model output too short: got {got} samples, need at least {need}")]
    OutputTooShort { got: usize, need: usize },

    /// Engine produced a tensor of unexpected shape
    #[error("Invalid output shape: expected {expected}, got {got}")]
    InvalidOutputShape { expected: String, got: String },

    /// Model arity does not match the expected source labels
    #[error("Source count mismatch: got {got} sources, expected {expected}")]
    SourceCountMismatch { got: usize, expected: usize },

    /// A sample position accumulated zero weight. Indicates a planner or
    /// config defect, never a normal runtime condition.
    #[error("Zero accumulated weight at sample {position}")]
    ZeroWeight { position: usize },

    /// Tract error
    #[error("Tract error: {0}")]
    TractError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for separation operations
pub type SepResult<T> = Result<T, SepError>;
