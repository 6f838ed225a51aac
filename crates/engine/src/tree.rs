//! Hierarchical tree construction and multi-level search
//!
//! Bottom-up RAPTOR-style build: level 0 is the leaf chunks; each level
//! above clusters the previous level's nodes with seeded k-means. A cluster
//! node is represented by the real member chunk nearest its centroid - a
//! deterministic proxy for a generated summary, never an actual summary.

use crate::cluster::{squared_distance, Kmeans};
use crate::{EngineError, Result};
use hyrag_core::{
    centroid, cosine_similarity, Chunk, ChunkId, ChunkTree, CoreError, RetrievalResult, Signal,
    TreeNode, TreeNodeId,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Default target children per cluster, from the original tree builder
pub const DEFAULT_BRANCHING_FACTOR: usize = 4;
/// Default maximum number of cluster levels above the leaves
pub const DEFAULT_MAX_LEVELS: usize = 3;
/// Fixed clustering seed for reproducible builds
pub const DEFAULT_SEED: u64 = 42;

/// Which tree levels a search should consider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Levels {
    All,
    Only(BTreeSet<u32>),
}

impl Levels {
    fn contains(&self, level: u32) -> bool {
        match self {
            Levels::All => true,
            Levels::Only(set) => set.contains(&level),
        }
    }
}

/// Builds the hierarchical tree for one document's chunk set.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    /// Target children per cluster; each level partitions n nodes into
    /// ceil(n / branching_factor) clusters
    branching_factor: usize,
    max_levels: usize,
    seed: u64,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            branching_factor: DEFAULT_BRANCHING_FACTOR,
            max_levels: DEFAULT_MAX_LEVELS,
            seed: DEFAULT_SEED,
        }
    }

    /// Builder: set target children per cluster
    pub fn with_branching_factor(mut self, branching_factor: usize) -> Self {
        self.branching_factor = branching_factor.max(2);
        self
    }

    /// Builder: set maximum cluster levels above the leaves
    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    /// Builder: set the clustering seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Build the tree bottom-up.
    ///
    /// Building stops when the working set collapses to a single root, when
    /// `max_levels` is reached, or when a level stops shrinking. Singleton
    /// clusters are promoted unchanged instead of being force-merged; a
    /// promoted node keeps its original level and gains a parent only when
    /// it joins a later cluster.
    pub fn build(&self, chunks: &[Chunk]) -> Result<ChunkTree> {
        let mut tree = ChunkTree::default();
        if chunks.is_empty() {
            return Ok(tree);
        }

        let dimension = chunks[0].embedding.len();
        for chunk in chunks {
            if chunk.embedding.len() != dimension || dimension == 0 {
                return Err(EngineError::Core(CoreError::Validation(format!(
                    "chunk {} has embedding dimension {}, expected {}",
                    chunk.id,
                    chunk.embedding.len(),
                    dimension
                ))));
            }
        }

        let embeddings: BTreeMap<ChunkId, &[f32]> = chunks
            .iter()
            .map(|c| (c.id.clone(), c.embedding.as_slice()))
            .collect();

        // Level 0: one leaf per chunk, in sequence order
        let mut working: Vec<TreeNodeId> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let id = tree.nodes.len();
            tree.nodes.push(TreeNode {
                id,
                level: 0,
                representative_chunk_id: chunk.id.clone(),
                member_chunk_ids: BTreeSet::from([chunk.id.clone()]),
                children: Vec::new(),
                parent: None,
            });
            working.push(id);
        }
        tree.levels.push(working.clone());

        for level in 1..=self.max_levels {
            if working.len() <= 1 {
                break;
            }
            let k = working.len().div_ceil(self.branching_factor).max(1);
            if k >= working.len() {
                // Clustering cannot shrink this level any further
                break;
            }

            let points: Vec<Vec<f32>> = working
                .iter()
                .map(|&id| node_centroid(&tree.nodes[id], &embeddings))
                .collect();
            // Seed varies per level so levels are independent draws while
            // the whole build stays a pure function of (input, seed)
            let labels = Kmeans::new(k, self.seed.wrapping_add(level as u64)).fit_predict(&points);

            // Group working nodes by cluster label; BTreeMap order keeps
            // node-id assignment deterministic
            let mut clusters: BTreeMap<usize, Vec<TreeNodeId>> = BTreeMap::new();
            for (&node_id, &label) in working.iter().zip(labels.iter()) {
                clusters.entry(label).or_default().push(node_id);
            }

            let mut next: Vec<TreeNodeId> = Vec::new();
            let mut created: Vec<TreeNodeId> = Vec::new();
            for members in clusters.values() {
                if members.len() == 1 {
                    // Promoted unchanged; may merge at a later level
                    next.push(members[0]);
                    continue;
                }

                let mut member_chunks: BTreeSet<ChunkId> = BTreeSet::new();
                for &child in members {
                    member_chunks.extend(tree.nodes[child].member_chunk_ids.iter().cloned());
                }
                let center = members_centroid(&member_chunks, &embeddings);
                let representative = nearest_chunk(&member_chunks, &center, &embeddings);

                let id = tree.nodes.len();
                tree.nodes.push(TreeNode {
                    id,
                    level: level as u32,
                    representative_chunk_id: representative,
                    member_chunk_ids: member_chunks,
                    children: members.clone(),
                    parent: None,
                });
                for &child in members {
                    tree.nodes[child].parent = Some(id);
                }
                next.push(id);
                created.push(id);
            }

            if created.is_empty() {
                // Every cluster was a singleton: nothing shrank
                break;
            }
            debug!(
                "Level {}: {} nodes clustered into {} ({} new)",
                level,
                working.len(),
                next.len(),
                created.len()
            );
            tree.levels.push(created);
            working = next;
        }

        info!(
            "Built tree: {} nodes over {} levels for {} chunks",
            tree.nodes.len(),
            tree.depth(),
            chunks.len()
        );
        Ok(tree)
    }
}

/// Centroid of a node's member chunk embeddings
fn node_centroid(node: &TreeNode, embeddings: &BTreeMap<ChunkId, &[f32]>) -> Vec<f32> {
    let members: Vec<&[f32]> = node
        .member_chunk_ids
        .iter()
        .filter_map(|id| embeddings.get(id).copied())
        .collect();
    centroid(&members)
}

fn members_centroid(members: &BTreeSet<ChunkId>, embeddings: &BTreeMap<ChunkId, &[f32]>) -> Vec<f32> {
    let vectors: Vec<&[f32]> = members
        .iter()
        .filter_map(|id| embeddings.get(id).copied())
        .collect();
    centroid(&vectors)
}

/// Member chunk nearest the centroid; BTreeSet order + strict `<` break
/// ties toward the lowest chunk id.
fn nearest_chunk(
    members: &BTreeSet<ChunkId>,
    center: &[f32],
    embeddings: &BTreeMap<ChunkId, &[f32]>,
) -> ChunkId {
    let mut best: Option<(&ChunkId, f32)> = None;
    for id in members {
        let Some(embedding) = embeddings.get(id) else {
            continue;
        };
        let dist = squared_distance(embedding, center);
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((id, dist)),
        }
    }
    best.map(|(id, _)| id.clone())
        .unwrap_or_else(|| members.iter().next().cloned().expect("non-empty cluster"))
}

/// Multi-level tree search.
///
/// Scores the query against every node's representative embedding at the
/// requested levels and expands each of the `top_k` best nodes to its full
/// member set at the node's score. Low levels surface precise passages,
/// high levels surface topic-level passages; the caller deduplicates
/// chunks reached through multiple nodes.
pub fn search(
    tree: &ChunkTree,
    chunks: &[Chunk],
    query_embedding: &[f32],
    top_k: usize,
    levels: &Levels,
) -> Vec<RetrievalResult> {
    if tree.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let embeddings: BTreeMap<&ChunkId, &[f32]> = chunks
        .iter()
        .map(|c| (&c.id, c.embedding.as_slice()))
        .collect();

    let mut scored: Vec<(TreeNodeId, f64)> = tree
        .nodes
        .iter()
        .filter(|node| levels.contains(node.level))
        .filter_map(|node| {
            embeddings
                .get(&node.representative_chunk_id)
                .map(|rep| (node.id, cosine_similarity(rep, query_embedding) as f64))
        })
        .collect();
    // Stable sort: equal similarities keep ascending node-id order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);

    let mut results = Vec::new();
    for (node_id, score) in scored {
        let node = &tree.nodes[node_id];
        for chunk_id in &node.member_chunk_ids {
            results.push(RetrievalResult {
                chunk_id: chunk_id.clone(),
                score,
                source: Signal::Raptor,
                rank: results.len() + 1,
            });
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Eight chunks in two well-separated embedding groups of four
    fn eight_chunks() -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for i in 0..8u32 {
            let base = if i < 4 { 0.0 } else { 10.0 };
            let embedding = vec![base + (i % 4) as f32 * 0.1, base];
            chunks.push(
                Chunk::new("doc", i, format!("passage {}", i)).with_embedding(embedding),
            );
        }
        chunks
    }

    #[test]
    fn test_leaf_members_are_singletons() {
        let tree = TreeBuilder::new().build(&eight_chunks()).unwrap();
        for node in tree.nodes_at_level(0) {
            assert_eq!(node.level, 0);
            assert_eq!(node.member_chunk_ids.len(), 1);
            assert!(node.member_chunk_ids.contains(&node.representative_chunk_id));
        }
    }

    #[test]
    fn test_eight_chunks_collapse_to_root() {
        // Every level shrinks the working set, so eight leaves always
        // collapse within eight levels
        let tree = TreeBuilder::new()
            .with_branching_factor(2)
            .with_max_levels(8)
            .build(&eight_chunks())
            .unwrap();

        assert_eq!(tree.levels[0].len(), 8);
        assert!(tree.depth() >= 2);
        assert!(tree.levels[1].len() < 8);
        let root = tree.root().expect("single root at the top level");
        assert_eq!(root.member_chunk_ids.len(), 8);
    }

    #[test]
    fn test_branching_two_halves_every_level_to_a_root() {
        // Two well-separated groups of four: each level pairs neighbors,
        // so the working set halves until a root appears at level three
        let tree = TreeBuilder::new()
            .with_branching_factor(2)
            .with_max_levels(3)
            .build(&eight_chunks())
            .unwrap();

        let shape: Vec<usize> = tree.levels.iter().map(|level| level.len()).collect();
        assert_eq!(shape, vec![8, 4, 2, 1]);

        let root = tree.root().expect("single root at the top level");
        assert_eq!(root.level, 3);
        assert_eq!(root.member_chunk_ids.len(), 8);
    }

    #[test]
    fn test_build_is_idempotent() {
        let chunks = eight_chunks();
        let a = TreeBuilder::new().build(&chunks).unwrap();
        let b = TreeBuilder::new().build(&chunks).unwrap();

        assert_eq!(a.levels, b.levels);
        assert_eq!(a.nodes, b.nodes);
    }

    #[test]
    fn test_every_non_top_node_has_one_parent() {
        // Enough levels that the build always collapses to a single root
        let tree = TreeBuilder::new()
            .with_branching_factor(2)
            .with_max_levels(8)
            .build(&eight_chunks())
            .unwrap();
        let root_id = tree.root().unwrap().id;

        for node in &tree.nodes {
            if node.id == root_id {
                assert!(node.parent.is_none());
            } else {
                let parent = node.parent.expect("non-root node has a parent");
                assert!(tree.nodes[parent].children.contains(&node.id));
                assert!(tree.nodes[parent].level > node.level);
            }
        }
    }

    #[test]
    fn test_single_chunk_corpus() {
        let chunks = vec![Chunk::new("doc", 0, "only passage").with_embedding(vec![1.0, 0.0])];
        let tree = TreeBuilder::new().build(&chunks).unwrap();

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].level, 0);
    }

    #[test]
    fn test_fewer_chunks_than_branching_factor() {
        let chunks: Vec<Chunk> = (0..3u32)
            .map(|i| Chunk::new("doc", i, "p").with_embedding(vec![i as f32, 1.0]))
            .collect();
        let tree = TreeBuilder::new()
            .with_branching_factor(8)
            .build(&chunks)
            .unwrap();

        // Flatter tree, still valid: leaves plus at most one cluster level
        assert_eq!(tree.levels[0].len(), 3);
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_empty_corpus() {
        let tree = TreeBuilder::new().build(&[]).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_mismatched_dimensions_rejected() {
        let chunks = vec![
            Chunk::new("doc", 0, "a").with_embedding(vec![1.0, 0.0]),
            Chunk::new("doc", 1, "b").with_embedding(vec![1.0]),
        ];
        assert!(TreeBuilder::new().build(&chunks).is_err());
    }

    #[test]
    fn test_search_high_level_expands_members() {
        let chunks = eight_chunks();
        let tree = TreeBuilder::new()
            .with_branching_factor(2)
            .with_max_levels(8)
            .build(&chunks)
            .unwrap();

        // Query near the first group; search only the top level
        let top = (tree.depth() - 1) as u32;
        let results = search(
            &tree,
            &chunks,
            &[0.1, 0.0],
            1,
            &Levels::Only(BTreeSet::from([top])),
        );

        // The single top node expands to all of its member chunks
        let root = tree.root().unwrap();
        assert_eq!(results.len(), root.member_chunk_ids.len());
        assert!(results.windows(2).all(|w| w[0].score == w[1].score));
    }

    #[test]
    fn test_search_leaf_level_is_precise() {
        let chunks = eight_chunks();
        let tree = TreeBuilder::new().build(&chunks).unwrap();

        let results = search(
            &tree,
            &chunks,
            &[10.05, 10.0],
            2,
            &Levels::Only(BTreeSet::from([0])),
        );

        assert_eq!(results.len(), 2);
        // Both hits come from the far group
        assert!(results.iter().all(|r| r.chunk_id.index >= 4));
    }

    #[test]
    fn test_search_empty_tree() {
        let tree = ChunkTree::default();
        assert!(search(&tree, &[], &[1.0], 5, &Levels::All).is_empty());
    }
}
