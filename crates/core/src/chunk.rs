//! Chunk types - the immutable text units every index is built over

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a chunk: the owning document plus its position in it.
///
/// The derived `Ord` sorts by document id, then by sequence index. That
/// ordering is the canonical "sequence order" used for every deterministic
/// tie-break in ranking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId {
    pub doc_id: String,
    pub index: u32,
}

impl ChunkId {
    pub fn new(doc_id: impl Into<String>, index: u32) -> Self {
        Self {
            doc_id: doc_id.into(),
            index,
        }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.doc_id, self.index)
    }
}

/// A bounded unit of source text with a stable id and a precomputed
/// embedding. Immutable once created; the index builders only read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier (document + sequence index)
    pub id: ChunkId,

    /// The chunk text
    pub text: String,

    /// Vector embedding, same model/dimensionality for the whole corpus
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,

    /// Document this chunk was split from
    pub source_doc_id: String,

    /// Position of the chunk within its document
    pub sequence_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(doc_id: impl Into<String>, sequence_index: u32, text: impl Into<String>) -> Self {
        let doc_id = doc_id.into();
        Self {
            id: ChunkId::new(doc_id.clone(), sequence_index),
            text: text.into(),
            embedding: Vec::new(),
            source_doc_id: doc_id,
            sequence_index,
        }
    }

    /// Builder: set embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Check whether the chunk carries an embedding
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_creation() {
        let chunk = Chunk::new("doc-1", 3, "Some passage").with_embedding(vec![0.1, 0.2]);

        assert_eq!(chunk.id, ChunkId::new("doc-1", 3));
        assert_eq!(chunk.source_doc_id, "doc-1");
        assert_eq!(chunk.sequence_index, 3);
        assert!(chunk.has_embedding());
    }

    #[test]
    fn test_chunk_id_sequence_order() {
        let mut ids = vec![
            ChunkId::new("doc-1", 2),
            ChunkId::new("doc-1", 0),
            ChunkId::new("a-doc", 9),
        ];
        ids.sort();

        assert_eq!(ids[0], ChunkId::new("a-doc", 9));
        assert_eq!(ids[1], ChunkId::new("doc-1", 0));
        assert_eq!(ids[2], ChunkId::new("doc-1", 2));
    }

    #[test]
    fn test_chunk_id_display() {
        assert_eq!(ChunkId::new("doc-1", 7).to_string(), "doc-1:7");
    }
}
