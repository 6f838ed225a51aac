//! Error types for the core domain

use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid retrieval mode: {0}")]
    InvalidMode(String),

    #[error("Embedding dimension mismatch: index has {expected}, query has {actual}")]
    EmbeddingDimensionMismatch { expected: usize, actual: usize },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
