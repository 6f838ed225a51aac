//! Entity co-occurrence graph

use crate::ChunkId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A weighted edge between two entities that co-occur in chunks.
///
/// Invariant: `weight == supporting_chunk_ids.len()` - each distinct chunk
/// in which the pair co-occurs counts exactly once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Number of distinct chunks in which the pair co-occurs
    pub weight: u32,

    /// The chunks supporting this edge
    pub supporting_chunk_ids: BTreeSet<ChunkId>,
}

impl GraphEdge {
    /// Record a supporting chunk. Idempotent per chunk: re-adding the same
    /// chunk never inflates the weight.
    pub fn add_support(&mut self, chunk_id: ChunkId) {
        if self.supporting_chunk_ids.insert(chunk_id) {
            self.weight += 1;
        }
    }
}

/// The co-occurrence graph for one document's chunk set.
///
/// All maps are BTree-backed so iteration order, and with it every build
/// and serialized artifact, is identical across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityGraph {
    /// Edges keyed by the unordered entity pair, canonically `a < b`.
    /// Serialized as a flat edge list: JSON map keys must be strings.
    #[serde(with = "edge_list")]
    pub edges: BTreeMap<(String, String), GraphEdge>,

    /// Chunk index: normalized entity key -> chunks mentioning it
    pub entity_chunks: BTreeMap<String, BTreeSet<ChunkId>>,

    /// First-seen surface form per normalized key, for presentation
    pub display_forms: BTreeMap<String, String>,
}

impl EntityGraph {
    /// Canonical unordered pair key (`a < b`)
    pub fn edge_key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    /// Look up the edge between two entities, in either order
    pub fn edge(&self, a: &str, b: &str) -> Option<&GraphEdge> {
        self.edges.get(&Self::edge_key(a, b))
    }

    /// Entities adjacent to `key`, with the connecting edge
    pub fn neighbors<'a>(&'a self, key: &'a str) -> impl Iterator<Item = (&'a str, &'a GraphEdge)> {
        self.edges.iter().filter_map(move |((a, b), edge)| {
            if a == key {
                Some((b.as_str(), edge))
            } else if b == key {
                Some((a.as_str(), edge))
            } else {
                None
            }
        })
    }

    /// Whether the entity survived the occurrence threshold
    pub fn contains_entity(&self, key: &str) -> bool {
        self.entity_chunks.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.entity_chunks.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entity_chunks.len()
    }
}

/// Serde adapter: persist the edge map as a list of records so the
/// artifact stays plain JSON.
mod edge_list {
    use super::{ChunkId, GraphEdge};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::{BTreeMap, BTreeSet};

    #[derive(Serialize, Deserialize)]
    struct EdgeRecord {
        entity_a: String,
        entity_b: String,
        weight: u32,
        supporting_chunk_ids: BTreeSet<ChunkId>,
    }

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<(String, String), GraphEdge>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let records: Vec<EdgeRecord> = map
            .iter()
            .map(|((a, b), edge)| EdgeRecord {
                entity_a: a.clone(),
                entity_b: b.clone(),
                weight: edge.weight,
                supporting_chunk_ids: edge.supporting_chunk_ids.clone(),
            })
            .collect();
        records.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<(String, String), GraphEdge>, D::Error> {
        let records = Vec::<EdgeRecord>::deserialize(deserializer)?;
        Ok(records
            .into_iter()
            .map(|r| {
                (
                    (r.entity_a, r.entity_b),
                    GraphEdge {
                        weight: r.weight,
                        supporting_chunk_ids: r.supporting_chunk_ids,
                    },
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_support_no_double_counting() {
        let mut edge = GraphEdge::default();
        edge.add_support(ChunkId::new("d", 0));
        edge.add_support(ChunkId::new("d", 0));
        edge.add_support(ChunkId::new("d", 1));

        assert_eq!(edge.weight, 2);
        assert_eq!(edge.supporting_chunk_ids.len(), 2);
    }

    #[test]
    fn test_edge_key_canonical_order() {
        assert_eq!(
            EntityGraph::edge_key("treaty", "paris"),
            ("paris".into(), "treaty".into())
        );
        assert_eq!(
            EntityGraph::edge_key("paris", "treaty"),
            EntityGraph::edge_key("treaty", "paris")
        );
    }

    #[test]
    fn test_neighbors_both_directions() {
        let mut graph = EntityGraph::default();
        let mut edge = GraphEdge::default();
        edge.add_support(ChunkId::new("d", 0));
        graph
            .edges
            .insert(EntityGraph::edge_key("paris", "treaty"), edge);

        let from_paris: Vec<_> = graph.neighbors("paris").map(|(k, _)| k).collect();
        let from_treaty: Vec<_> = graph.neighbors("treaty").map(|(k, _)| k).collect();
        assert_eq!(from_paris, vec!["treaty"]);
        assert_eq!(from_treaty, vec!["paris"]);
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let mut graph = EntityGraph::default();
        let mut edge = GraphEdge::default();
        edge.add_support(ChunkId::new("d", 0));
        edge.add_support(ChunkId::new("d", 2));
        graph
            .edges
            .insert(EntityGraph::edge_key("a", "b"), edge.clone());
        graph
            .entity_chunks
            .insert("a".into(), edge.supporting_chunk_ids.clone());
        graph.display_forms.insert("a".into(), "A".into());

        let json = serde_json::to_string(&graph).unwrap();
        let back: EntityGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.edges, graph.edges);
        assert_eq!(back.entity_chunks, graph.entity_chunks);
        assert_eq!(back.display_forms, graph.display_forms);
    }
}
