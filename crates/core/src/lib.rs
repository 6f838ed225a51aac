//! Core domain types for the hybrid retrieval engine
//!
//! This crate defines the fundamental data structures shared by the
//! index builders and the retrieval router: chunks, entities, the
//! co-occurrence graph, the hierarchical tree, and retrieval results.
//! It is pure data + invariants: no I/O, no async.

pub mod chunk;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod graph;
pub mod result;
pub mod tree;

pub use chunk::{Chunk, ChunkId};
pub use embedding::{centroid, cosine_similarity, ensure_dimension};
pub use entity::{normalize_key, Entity};
pub use error::{CoreError, Result};
pub use graph::{EntityGraph, GraphEdge};
pub use result::{RetrievalMode, RetrievalResult, Signal};
pub use tree::{ChunkTree, TreeNode, TreeNodeId};
