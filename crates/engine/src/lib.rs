//! Retrieval engine for the hybrid RAG system
//!
//! This crate contains the retrieval core:
//! - GraphBuilder: entity co-occurrence graph over a document's chunks
//! - TreeBuilder: RAPTOR-style hierarchical cluster tree
//! - Retriever: query-time router fusing vector, graph, and tree signals
//!
//! plus the collaborator implementations it drives: the entity extractor,
//! the embeddings client, and the paragraph ingestor.

pub mod cluster;
pub mod embedder;
pub mod error;
pub mod extract;
pub mod fusion;
pub mod graph;
pub mod ingest;
pub mod router;
pub mod tree;

pub use embedder::{EmbeddingProvider, TeiClient};
pub use error::{EngineError, Result};
pub use extract::{detect_language, extract_entities, Language};
pub use graph::GraphBuilder;
pub use ingest::Ingestor;
pub use router::{DocumentIndex, Retriever};
pub use tree::{Levels, TreeBuilder};
