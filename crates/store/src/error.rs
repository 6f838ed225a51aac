//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Artifact decode failed for doc {doc_id}: {source}")]
    ArtifactDecode {
        doc_id: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, DbError>;
