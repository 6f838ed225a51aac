//! Repository pattern for chunk and artifact operations

use crate::{DbConnection, DbError, Result};
use chrono::{DateTime, Utc};
use hyrag_core::{Chunk, ChunkId, ChunkTree, EntityGraph};
use serde::{Deserialize, Serialize};
use surrealdb::types::RecordId;
use surrealdb_types::SurrealValue;
use tracing::instrument;

/// Repository for all database operations
#[derive(Clone)]
pub struct Repository {
    db: DbConnection,
}

/// Stored form of a [`Chunk`]
#[derive(Debug, Clone, Serialize, Deserialize, SurrealValue)]
pub struct ChunkRow {
    /// SurrealDB record id (generated on create)
    pub id: Option<RecordId>,
    pub doc_id: String,
    pub sequence_index: i64,
    pub text: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

impl ChunkRow {
    fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            id: None,
            doc_id: chunk.source_doc_id.clone(),
            sequence_index: chunk.sequence_index as i64,
            text: chunk.text.clone(),
            embedding: if chunk.embedding.is_empty() {
                None
            } else {
                Some(chunk.embedding.clone())
            },
            created_at: Utc::now(),
        }
    }

    fn into_chunk(self) -> Chunk {
        let index = self.sequence_index as u32;
        Chunk {
            id: ChunkId::new(self.doc_id.clone(), index),
            text: self.text,
            embedding: self.embedding.unwrap_or_default(),
            source_doc_id: self.doc_id,
            sequence_index: index,
        }
    }
}

/// Stored form of a built graph or tree
#[derive(Debug, Clone, Serialize, Deserialize, SurrealValue)]
struct ArtifactRow {
    id: Option<RecordId>,
    doc_id: String,
    /// JSON-encoded artifact; lossless round-trip is the contract
    data: String,
    /// Embedding dimension the artifact was built against
    dimension: Option<i64>,
    #[serde(skip_serializing)]
    built_at: DateTime<Utc>,
}

/// Corpus-level counters for the CLI stats command
#[derive(Debug, Clone, Serialize, Deserialize, Default, SurrealValue)]
pub struct StoreStats {
    #[serde(default)]
    pub chunk_count: i64,
    #[serde(default)]
    pub doc_count: i64,
    #[serde(default)]
    pub graph_count: i64,
    #[serde(default)]
    pub tree_count: i64,
}

impl Repository {
    /// Create a new repository
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    // ==========================================
    // CHUNK OPERATIONS
    // ==========================================

    /// Store one chunk
    #[instrument(skip(self, chunk))]
    pub async fn create_chunk(&self, chunk: &Chunk) -> Result<()> {
        let _: Option<ChunkRow> = self
            .db
            .create("chunk")
            .content(ChunkRow::from_chunk(chunk))
            .await?;
        Ok(())
    }

    /// Store a batch of chunks for one document
    #[instrument(skip(self, chunks))]
    pub async fn create_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        for chunk in chunks {
            self.create_chunk(chunk).await?;
        }
        Ok(chunks.len())
    }

    /// List a document's chunks ordered by sequence index.
    ///
    /// This is the Chunk Store contract the retrieval core builds on.
    #[instrument(skip(self))]
    pub async fn list_chunks(&self, doc_id: &str) -> Result<Vec<Chunk>> {
        let rows: Vec<ChunkRow> = self
            .db
            .query("SELECT * FROM chunk WHERE doc_id = $doc_id ORDER BY sequence_index ASC")
            .bind(("doc_id", doc_id.to_string()))
            .await?
            .take(0)?;

        Ok(rows.into_iter().map(ChunkRow::into_chunk).collect())
    }

    /// Distinct document ids present in the store
    #[instrument(skip(self))]
    pub async fn list_doc_ids(&self) -> Result<Vec<String>> {
        #[derive(SurrealValue)]
        struct DocRow {
            doc_id: String,
        }

        let rows: Vec<DocRow> = self
            .db
            .query("SELECT doc_id FROM chunk GROUP BY doc_id")
            .await?
            .take(0)?;

        let mut ids: Vec<String> = rows.into_iter().map(|r| r.doc_id).collect();
        ids.sort();
        Ok(ids)
    }

    /// Remove a document's chunks and any built artifacts
    #[instrument(skip(self))]
    pub async fn delete_doc(&self, doc_id: &str) -> Result<()> {
        self.db
            .query(
                "DELETE chunk WHERE doc_id = $doc_id;
                 DELETE graph_artifact WHERE doc_id = $doc_id;
                 DELETE tree_artifact WHERE doc_id = $doc_id;",
            )
            .bind(("doc_id", doc_id.to_string()))
            .await?;
        Ok(())
    }

    // ==========================================
    // ARTIFACT OPERATIONS
    // ==========================================

    /// Persist a built co-occurrence graph, replacing any previous one.
    ///
    /// Delete + create runs in one request, so a loaded artifact is always
    /// a complete build, never a partial one.
    #[instrument(skip(self, graph))]
    pub async fn save_graph(
        &self,
        doc_id: &str,
        graph: &EntityGraph,
        dimension: usize,
    ) -> Result<()> {
        let data = serde_json::to_string(graph).map_err(|source| DbError::ArtifactDecode {
            doc_id: doc_id.to_string(),
            source,
        })?;
        self.replace_artifact("graph_artifact", doc_id, data, dimension)
            .await
    }

    /// Load a document's graph, if one was built
    #[instrument(skip(self))]
    pub async fn load_graph(&self, doc_id: &str) -> Result<Option<EntityGraph>> {
        match self.load_artifact("graph_artifact", doc_id).await? {
            Some(data) => {
                let graph =
                    serde_json::from_str(&data).map_err(|source| DbError::ArtifactDecode {
                        doc_id: doc_id.to_string(),
                        source,
                    })?;
                Ok(Some(graph))
            }
            None => Ok(None),
        }
    }

    /// Persist a built hierarchical tree, replacing any previous one
    #[instrument(skip(self, tree))]
    pub async fn save_tree(&self, doc_id: &str, tree: &ChunkTree, dimension: usize) -> Result<()> {
        let data = serde_json::to_string(tree).map_err(|source| DbError::ArtifactDecode {
            doc_id: doc_id.to_string(),
            source,
        })?;
        self.replace_artifact("tree_artifact", doc_id, data, dimension)
            .await
    }

    /// Load a document's tree, if one was built
    #[instrument(skip(self))]
    pub async fn load_tree(&self, doc_id: &str) -> Result<Option<ChunkTree>> {
        match self.load_artifact("tree_artifact", doc_id).await? {
            Some(data) => {
                let tree =
                    serde_json::from_str(&data).map_err(|source| DbError::ArtifactDecode {
                        doc_id: doc_id.to_string(),
                        source,
                    })?;
                Ok(Some(tree))
            }
            None => Ok(None),
        }
    }

    async fn replace_artifact(
        &self,
        table: &'static str,
        doc_id: &str,
        data: String,
        dimension: usize,
    ) -> Result<()> {
        // Table name must be literal in the statement, so pick per table
        let statement = match table {
            "graph_artifact" => {
                "DELETE graph_artifact WHERE doc_id = $doc_id;
                 CREATE graph_artifact SET doc_id = $doc_id, data = $data, dimension = $dimension, built_at = time::now();"
            }
            _ => {
                "DELETE tree_artifact WHERE doc_id = $doc_id;
                 CREATE tree_artifact SET doc_id = $doc_id, data = $data, dimension = $dimension, built_at = time::now();"
            }
        };

        self.db
            .query(statement)
            .bind(("doc_id", doc_id.to_string()))
            .bind(("data", data))
            .bind(("dimension", dimension as i64))
            .await?;

        Ok(())
    }

    async fn load_artifact(&self, table: &'static str, doc_id: &str) -> Result<Option<String>> {
        #[derive(SurrealValue)]
        struct DataRow {
            data: String,
        }

        let statement = match table {
            "graph_artifact" => "SELECT data FROM graph_artifact WHERE doc_id = $doc_id",
            _ => "SELECT data FROM tree_artifact WHERE doc_id = $doc_id",
        };

        let rows: Vec<DataRow> = self
            .db
            .query(statement)
            .bind(("doc_id", doc_id.to_string()))
            .await?
            .take(0)?;

        Ok(rows.into_iter().next().map(|r| r.data))
    }

    // ==========================================
    // STATS
    // ==========================================

    /// Get corpus statistics
    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<StoreStats> {
        let stats: Vec<StoreStats> = self
            .db
            .query(
                r#"
                RETURN {
                    chunk_count: (SELECT count() FROM chunk GROUP ALL)[0].count,
                    doc_count: array::len(SELECT doc_id FROM chunk GROUP BY doc_id),
                    graph_count: (SELECT count() FROM graph_artifact GROUP ALL)[0].count,
                    tree_count: (SELECT count() FROM tree_artifact GROUP ALL)[0].count
                }
            "#,
            )
            .await?
            .take(0)?;

        stats
            .into_iter()
            .next()
            .ok_or_else(|| DbError::QueryFailed("stats".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_memory;
    use hyrag_core::graph::GraphEdge;

    async fn test_repo() -> Repository {
        let db = init_memory().await.expect("Failed to init db");
        Repository::new(db)
    }

    fn sample_chunks(doc_id: &str, n: u32) -> Vec<Chunk> {
        (0..n)
            .map(|i| {
                Chunk::new(doc_id, i, format!("Chunk number {}", i))
                    .with_embedding(vec![i as f32, 1.0])
            })
            .collect()
    }

    #[tokio::test]
    async fn test_chunks_round_trip_in_sequence_order() {
        let repo = test_repo().await;

        // Insert out of order; listing must come back ordered
        let chunks = sample_chunks("doc-1", 3);
        repo.create_chunk(&chunks[2]).await.unwrap();
        repo.create_chunk(&chunks[0]).await.unwrap();
        repo.create_chunk(&chunks[1]).await.unwrap();

        let listed = repo.list_chunks("doc-1").await.unwrap();
        assert_eq!(listed.len(), 3);
        let indexes: Vec<u32> = listed.iter().map(|c| c.sequence_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(listed[1].text, "Chunk number 1");
        assert_eq!(listed[1].embedding, vec![1.0, 1.0]);
    }

    #[tokio::test]
    async fn test_list_chunks_unknown_doc_is_empty() {
        let repo = test_repo().await;
        let listed = repo.list_chunks("missing").await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_graph_artifact_round_trip() {
        let repo = test_repo().await;

        let mut graph = EntityGraph::default();
        let mut edge = GraphEdge::default();
        edge.add_support(ChunkId::new("doc-1", 0));
        edge.add_support(ChunkId::new("doc-1", 1));
        graph
            .edges
            .insert(EntityGraph::edge_key("paris", "treaty"), edge);
        graph.display_forms.insert("paris".into(), "Paris".into());

        repo.save_graph("doc-1", &graph, 4).await.unwrap();
        let loaded = repo.load_graph("doc-1").await.unwrap().unwrap();

        assert_eq!(loaded.edges, graph.edges);
        assert_eq!(loaded.display_forms, graph.display_forms);

        // Replacing overwrites rather than accumulating
        repo.save_graph("doc-1", &EntityGraph::default(), 4)
            .await
            .unwrap();
        let replaced = repo.load_graph("doc-1").await.unwrap().unwrap();
        assert!(replaced.is_empty());
    }

    #[tokio::test]
    async fn test_missing_artifacts_load_as_none() {
        let repo = test_repo().await;
        assert!(repo.load_graph("doc-1").await.unwrap().is_none());
        assert!(repo.load_tree("doc-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_doc_removes_everything() {
        let repo = test_repo().await;
        repo.create_chunks(&sample_chunks("doc-1", 2)).await.unwrap();
        repo.save_graph("doc-1", &EntityGraph::default(), 2)
            .await
            .unwrap();

        repo.delete_doc("doc-1").await.unwrap();

        assert!(repo.list_chunks("doc-1").await.unwrap().is_empty());
        assert!(repo.load_graph("doc-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats() {
        let repo = test_repo().await;
        repo.create_chunks(&sample_chunks("doc-1", 2)).await.unwrap();
        repo.create_chunks(&sample_chunks("doc-2", 1)).await.unwrap();

        let stats = repo.get_stats().await.unwrap();
        assert_eq!(stats.chunk_count, 3);
        assert_eq!(stats.doc_count, 2);
    }
}
