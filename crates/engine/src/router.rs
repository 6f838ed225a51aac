//! Retrieval router: dispatches queries to the vector, graph, and tree
//! signals and fuses their outputs into one ranked result list
//!
//! Indexes are read-only at query time. Rebuilds construct fresh structures
//! and swap an `Arc` into the cache, so a concurrent reader either sees the
//! old complete index or the new complete index, never a partial one.

use crate::extract::{detect_language, extract_entities};
use crate::{fusion, graph, tree, EmbeddingProvider, EngineError, GraphBuilder, Result, TreeBuilder};
use hyrag_core::{
    cosine_similarity, ensure_dimension, Chunk, ChunkTree, EntityGraph, RetrievalMode,
    RetrievalResult, Signal,
};
use hyrag_store::Repository;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Default number of graph hops for graph-mode expansion
pub const DEFAULT_EXPAND_HOPS: usize = 1;

/// Everything needed to answer queries against one document: the chunk set
/// with cached embeddings plus the two built indexes over it.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    pub chunks: Vec<Chunk>,
    pub graph: EntityGraph,
    pub tree: ChunkTree,
    /// Embedding dimensionality of the indexed chunks (0 when empty)
    pub dimension: usize,
}

impl DocumentIndex {
    fn from_parts(chunks: Vec<Chunk>, graph: EntityGraph, tree: ChunkTree) -> Self {
        let dimension = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);
        Self {
            chunks,
            graph,
            tree,
            dimension,
        }
    }
}

/// The retrieval engine: index building plus the four query modes.
pub struct Retriever {
    repo: Repository,
    embedder: Arc<dyn EmbeddingProvider>,
    graph_builder: GraphBuilder,
    tree_builder: TreeBuilder,
    expand_hops: usize,
    vector_weight: f64,
    graph_weight: f64,
    indexes: RwLock<HashMap<String, Arc<DocumentIndex>>>,
}

impl Retriever {
    pub fn new(repo: Repository, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            repo,
            embedder,
            graph_builder: GraphBuilder::new(),
            tree_builder: TreeBuilder::new(),
            expand_hops: DEFAULT_EXPAND_HOPS,
            vector_weight: 1.0,
            graph_weight: 1.0,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Builder: configure graph construction
    pub fn with_graph_builder(mut self, graph_builder: GraphBuilder) -> Self {
        self.graph_builder = graph_builder;
        self
    }

    /// Builder: configure tree construction
    pub fn with_tree_builder(mut self, tree_builder: TreeBuilder) -> Self {
        self.tree_builder = tree_builder;
        self
    }

    /// Builder: set graph expansion hops
    pub fn with_expand_hops(mut self, hops: usize) -> Self {
        self.expand_hops = hops;
        self
    }

    /// Builder: set hybrid fusion weights (default equal)
    pub fn with_fusion_weights(mut self, vector_weight: f64, graph_weight: f64) -> Self {
        self.vector_weight = vector_weight;
        self.graph_weight = graph_weight;
        self
    }

    // ==========================================
    // INDEX BUILDING
    // ==========================================

    /// Build and persist the co-occurrence graph for a document.
    ///
    /// Idempotent for the same chunk set. Fails wholesale on any
    /// collaborator failure; nothing partial is persisted or cached.
    #[instrument(skip(self))]
    pub async fn build_graph(&self, doc_id: &str) -> Result<EntityGraph> {
        let chunks = self.list_chunks(doc_id).await?;

        let mut entities_per_chunk = std::collections::BTreeMap::new();
        for chunk in &chunks {
            let language = detect_language(&chunk.text);
            entities_per_chunk.insert(chunk.id.clone(), extract_entities(&chunk.text, language));
        }

        let built = self.graph_builder.build(&chunks, &entities_per_chunk);
        let dimension = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);
        self.repo
            .save_graph(doc_id, &built, dimension)
            .await
            .map_err(|e| EngineError::store("save_graph", e))?;

        self.swap_index(doc_id, chunks, Some(built.clone()), None)
            .await?;
        info!("Graph built for document {}", doc_id);
        Ok(built)
    }

    /// Build and persist the hierarchical tree for a document.
    ///
    /// Independent of the graph: a graph failure never blocks the tree,
    /// and vice versa.
    #[instrument(skip(self))]
    pub async fn build_tree(&self, doc_id: &str) -> Result<ChunkTree> {
        let chunks = self.list_chunks(doc_id).await?;

        let built = self.tree_builder.build(&chunks)?;
        let dimension = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);
        self.repo
            .save_tree(doc_id, &built, dimension)
            .await
            .map_err(|e| EngineError::store("save_tree", e))?;

        self.swap_index(doc_id, chunks, None, Some(built.clone()))
            .await?;
        info!("Tree built for document {}", doc_id);
        Ok(built)
    }

    /// Replace the cached index with a freshly assembled one. Parts not
    /// being rebuilt are carried over from the previous cache entry or
    /// loaded from the store, so the swap is always complete-for-complete.
    async fn swap_index(
        &self,
        doc_id: &str,
        chunks: Vec<Chunk>,
        graph: Option<EntityGraph>,
        tree: Option<ChunkTree>,
    ) -> Result<()> {
        let previous = {
            let cache = self.indexes.read().await;
            cache.get(doc_id).cloned()
        };

        let graph = match (graph, &previous) {
            (Some(g), _) => g,
            (None, Some(prev)) => prev.graph.clone(),
            (None, None) => self.load_graph_artifact(doc_id).await?,
        };
        let tree = match (tree, &previous) {
            (Some(t), _) => t,
            (None, Some(prev)) => prev.tree.clone(),
            (None, None) => self.load_tree_artifact(doc_id).await?,
        };

        let index = Arc::new(DocumentIndex::from_parts(chunks, graph, tree));
        self.indexes
            .write()
            .await
            .insert(doc_id.to_string(), index);
        Ok(())
    }

    /// Get the cached index for a document, assembling it from the store
    /// on first use.
    async fn load_index(&self, doc_id: &str) -> Result<Arc<DocumentIndex>> {
        {
            let cache = self.indexes.read().await;
            if let Some(index) = cache.get(doc_id) {
                return Ok(index.clone());
            }
        }

        let chunks = self.list_chunks(doc_id).await?;
        let graph = self.load_graph_artifact(doc_id).await?;
        let tree = self.load_tree_artifact(doc_id).await?;
        let index = Arc::new(DocumentIndex::from_parts(chunks, graph, tree));

        let mut cache = self.indexes.write().await;
        let entry = cache.entry(doc_id.to_string()).or_insert_with(|| index);
        Ok(entry.clone())
    }

    async fn list_chunks(&self, doc_id: &str) -> Result<Vec<Chunk>> {
        self.repo
            .list_chunks(doc_id)
            .await
            .map_err(|e| EngineError::store("list_chunks", e))
    }

    async fn load_graph_artifact(&self, doc_id: &str) -> Result<EntityGraph> {
        Ok(self
            .repo
            .load_graph(doc_id)
            .await
            .map_err(|e| EngineError::store("load_graph", e))?
            .unwrap_or_default())
    }

    async fn load_tree_artifact(&self, doc_id: &str) -> Result<ChunkTree> {
        Ok(self
            .repo
            .load_tree(doc_id)
            .await
            .map_err(|e| EngineError::store("load_tree", e))?
            .unwrap_or_default())
    }

    // ==========================================
    // RETRIEVAL
    // ==========================================

    /// Retrieve chunks for a query. Read-only: no mode mutates any index.
    ///
    /// An empty index yields an empty list for every mode - "no results"
    /// is never conflated with "retrieval failed".
    #[instrument(skip(self, query))]
    pub async fn retrieve(
        &self,
        doc_id: &str,
        query: &str,
        mode: RetrievalMode,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let index = self.load_index(doc_id).await?;
        if index.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        debug!("Retrieving in {} mode, top_k={}", mode, top_k);

        let mut results = match mode {
            RetrievalMode::Vector => self.vector_signal(&index, query).await?,
            RetrievalMode::Graph => self.graph_signal(&index, query),
            RetrievalMode::Raptor => self.raptor_signal(&index, query, top_k).await?,
            RetrievalMode::Hybrid => {
                // Independent signals, no shared mutable state: run both and
                // join, so fusion stays deterministic
                let (vector, graph) = tokio::join!(
                    self.vector_signal(&index, query),
                    async { Ok::<_, EngineError>(self.graph_signal(&index, query)) },
                );
                let mut vector = vector?;
                let mut graph = graph?;
                // Fuse each signal's own top_k only: fusion reorders within
                // the union of the two result sets, it never admits chunks
                // neither mode would have returned
                vector.truncate(top_k);
                graph.truncate(top_k);
                fusion::min_max_normalize(&mut vector);
                fusion::min_max_normalize(&mut graph);
                fusion::fuse_weighted(vector, graph, self.vector_weight, self.graph_weight)
            }
        };

        results.truncate(top_k);
        Ok(results)
    }

    /// Flat cosine similarity over the chunk embeddings
    async fn vector_signal(
        &self,
        index: &DocumentIndex,
        query: &str,
    ) -> Result<Vec<RetrievalResult>> {
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| EngineError::embedding("embed_query", e))?;
        ensure_dimension(index.dimension, query_embedding.len()).map_err(EngineError::Core)?;

        let results: Vec<RetrievalResult> = index
            .chunks
            .iter()
            .map(|chunk| RetrievalResult {
                chunk_id: chunk.id.clone(),
                score: cosine_similarity(&chunk.embedding, &query_embedding) as f64,
                source: Signal::Vector,
                rank: 0,
            })
            .collect();
        Ok(fusion::rank(results))
    }

    /// Entity extraction on the query, then graph expansion
    fn graph_signal(&self, index: &DocumentIndex, query: &str) -> Vec<RetrievalResult> {
        let language = detect_language(query);
        let seeds = extract_entities(query, language);
        let expanded = graph::expand(&index.graph, &seeds, self.expand_hops);

        let results: Vec<RetrievalResult> = expanded
            .into_iter()
            .map(|(chunk_id, score)| RetrievalResult {
                chunk_id,
                score,
                source: Signal::Graph,
                rank: 0,
            })
            .collect();
        fusion::rank(results)
    }

    /// Tree search across all levels, deduplicating multi-node hits
    async fn raptor_signal(
        &self,
        index: &DocumentIndex,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| EngineError::embedding("embed_query", e))?;
        ensure_dimension(index.dimension, query_embedding.len()).map_err(EngineError::Core)?;

        let hits = tree::search(
            &index.tree,
            &index.chunks,
            &query_embedding,
            top_k,
            &tree::Levels::All,
        );
        Ok(fusion::rank(fusion::dedup_keep_highest(hits)))
    }
}
