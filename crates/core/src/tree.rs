//! Hierarchical cluster tree over chunk embeddings

use crate::ChunkId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Index of a node in [`ChunkTree::nodes`]. Assigned densely during the
/// bottom-up build, so ids are deterministic for a given input.
pub type TreeNodeId = usize;

/// One node of the tree: a leaf chunk at level 0, or a cluster above.
///
/// A cluster node has no text of its own; it is represented by the member
/// chunk nearest its centroid. That representative is a deterministic proxy,
/// NOT a generated summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: TreeNodeId,

    /// 0 for leaves, increasing toward the root
    pub level: u32,

    /// The real chunk standing in for this node
    pub representative_chunk_id: ChunkId,

    /// Every leaf chunk under this node. For a level-0 node this is the
    /// singleton set of its own chunk id.
    pub member_chunk_ids: BTreeSet<ChunkId>,

    /// Child node ids (empty for leaves)
    #[serde(default)]
    pub children: Vec<TreeNodeId>,

    /// Parent node id; `None` only for the top level
    #[serde(default)]
    pub parent: Option<TreeNodeId>,
}

/// The full tree for one document's chunk set, built bottom-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkTree {
    /// All nodes, indexed by `TreeNodeId`
    pub nodes: Vec<TreeNode>,

    /// Node ids per level; `levels[0]` are the leaves
    pub levels: Vec<Vec<TreeNodeId>>,
}

impl ChunkTree {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of levels (0 for an empty tree)
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Nodes at one level, leaves first
    pub fn nodes_at_level(&self, level: usize) -> impl Iterator<Item = &TreeNode> {
        self.levels
            .get(level)
            .into_iter()
            .flatten()
            .map(|id| &self.nodes[*id])
    }

    /// The root node: a single top-level node whose members cover every
    /// leaf chunk. A lone top node over part of the corpus is not a root.
    pub fn root(&self) -> Option<&TreeNode> {
        let top = self.levels.last()?;
        if top.len() != 1 {
            return None;
        }
        let candidate = &self.nodes[top[0]];
        let leaf_count = self.levels.first().map_or(0, |leaves| leaves.len());
        (candidate.member_chunk_ids.len() == leaf_count).then_some(candidate)
    }

    pub fn node(&self, id: TreeNodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }
}
