//! Engine error types
//!
//! Collaborator failures are wrapped with the failing operation's context
//! and propagated unchanged; builds fail wholesale on any of them.

use hyrag_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Chunk store failure during {op}: {source}")]
    ChunkStore {
        op: &'static str,
        #[source]
        source: hyrag_store::DbError,
    },

    #[error("Embedding provider failure during {op}: {source}")]
    Embedding {
        op: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EngineError {
    /// Wrap a chunk store failure with its operation context
    pub fn store(op: &'static str, source: hyrag_store::DbError) -> Self {
        Self::ChunkStore { op, source }
    }

    /// Wrap an embedding provider failure with its operation context
    pub fn embedding(
        op: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Embedding {
            op,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
