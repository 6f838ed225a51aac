//! SurrealDB schema definitions

use crate::{DbConnection, Result};
use tracing::info;

/// Initialize the database schema
pub async fn initialize_schema(db: &DbConnection) -> Result<()> {
    info!("Initializing database schema...");

    db.query(SCHEMA_DEFINITION).await?;

    info!("Schema initialized successfully");
    Ok(())
}

// No vector index on chunk embeddings: similarity search runs in the engine
// over cached embeddings, which keeps scores exact and the schema
// dimension-agnostic. The indexed dimension is recorded per artifact.
const SCHEMA_DEFINITION: &str = r#"
-- ============================================
-- TABLES
-- ============================================

-- Chunks: immutable text units with embeddings
DEFINE TABLE chunk SCHEMAFULL;
DEFINE FIELD doc_id ON chunk TYPE string;
DEFINE FIELD sequence_index ON chunk TYPE int;
DEFINE FIELD text ON chunk TYPE string;
DEFINE FIELD embedding ON chunk TYPE option<array<float>>;
DEFINE FIELD created_at ON chunk TYPE datetime DEFAULT time::now();

-- Built co-occurrence graphs, one per document, stored as JSON
DEFINE TABLE graph_artifact SCHEMAFULL;
DEFINE FIELD doc_id ON graph_artifact TYPE string;
DEFINE FIELD data ON graph_artifact TYPE string;
DEFINE FIELD dimension ON graph_artifact TYPE option<int>;
DEFINE FIELD built_at ON graph_artifact TYPE datetime DEFAULT time::now();

-- Built hierarchical trees, one per document, stored as JSON
DEFINE TABLE tree_artifact SCHEMAFULL;
DEFINE FIELD doc_id ON tree_artifact TYPE string;
DEFINE FIELD data ON tree_artifact TYPE string;
DEFINE FIELD dimension ON tree_artifact TYPE option<int>;
DEFINE FIELD built_at ON tree_artifact TYPE datetime DEFAULT time::now();

-- ============================================
-- INDEXES
-- ============================================

-- Chunk lookups by document, unique per sequence slot
DEFINE INDEX idx_chunk_doc_seq ON chunk FIELDS doc_id, sequence_index UNIQUE;

-- One artifact per document
DEFINE INDEX idx_graph_doc ON graph_artifact FIELDS doc_id UNIQUE;
DEFINE INDEX idx_tree_doc ON tree_artifact FIELDS doc_id UNIQUE;
"#;
