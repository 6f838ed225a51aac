//! Co-occurrence graph construction and query-time expansion

use hyrag_core::{Chunk, ChunkId, Entity, EntityGraph};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info};

/// Default minimum total occurrence count for an entity to enter the graph.
/// Below it an entity is excluded entirely - a density invariant, not a
/// soft filter.
pub const DEFAULT_MIN_OCCURRENCES: usize = 2;

/// Builds the entity co-occurrence graph for one document's chunk set.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    min_occurrences: usize,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            min_occurrences: DEFAULT_MIN_OCCURRENCES,
        }
    }

    /// Builder: set the occurrence threshold
    pub fn with_min_occurrences(mut self, min_occurrences: usize) -> Self {
        self.min_occurrences = min_occurrences;
        self
    }

    /// Build the graph from chunks and their extracted entity sets.
    ///
    /// Deterministic: chunks are visited in sequence order and entities in
    /// normalized-key order, so identical input yields identical edges and
    /// iteration order across runs. Chunks with empty entity sets and an
    /// empty corpus are both valid inputs.
    pub fn build(
        &self,
        chunks: &[Chunk],
        entities_per_chunk: &BTreeMap<ChunkId, Vec<Entity>>,
    ) -> EntityGraph {
        // Pass 1: total occurrence count per normalized entity
        let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
        let mut display_forms: BTreeMap<String, String> = BTreeMap::new();
        for chunk in chunks {
            let Some(entities) = entities_per_chunk.get(&chunk.id) else {
                continue;
            };
            for entity in entities {
                *occurrences.entry(entity.normalized_key.as_str()).or_insert(0) += 1;
                display_forms
                    .entry(entity.normalized_key.clone())
                    .or_insert_with(|| entity.display_form.clone());
            }
        }

        let surviving: BTreeSet<&str> = occurrences
            .iter()
            .filter(|(_, count)| **count >= self.min_occurrences)
            .map(|(key, _)| *key)
            .collect();

        debug!(
            "Entity threshold {}: {} of {} entities survive",
            self.min_occurrences,
            surviving.len(),
            occurrences.len()
        );

        // Pass 2: per chunk, every unordered pair of surviving entities
        let mut graph = EntityGraph::default();
        for chunk in chunks {
            let Some(entities) = entities_per_chunk.get(&chunk.id) else {
                continue;
            };
            // Sorted + deduplicated within the chunk: one chunk supports an
            // edge at most once, and self-pairs cannot arise
            let present: BTreeSet<&str> = entities
                .iter()
                .map(|e| e.normalized_key.as_str())
                .filter(|key| surviving.contains(key))
                .collect();

            for key in &present {
                graph
                    .entity_chunks
                    .entry((*key).to_string())
                    .or_default()
                    .insert(chunk.id.clone());
            }

            let present: Vec<&str> = present.into_iter().collect();
            for (i, a) in present.iter().enumerate() {
                for b in &present[i + 1..] {
                    graph
                        .edges
                        .entry(EntityGraph::edge_key(a, b))
                        .or_default()
                        .add_support(chunk.id.clone());
                }
            }
        }

        for key in graph.entity_chunks.keys() {
            if let Some(form) = display_forms.get(key) {
                graph.display_forms.insert(key.clone(), form.clone());
            }
        }

        info!(
            "Built co-occurrence graph: {} entities, {} edges",
            graph.entity_count(),
            graph.edge_count()
        );

        graph
    }
}

/// Expand seed entities through the graph and score reachable chunks.
///
/// Breadth-first over entities up to `hops`; every traversed edge
/// contributes its weight to each of its supporting chunks (higher weight =
/// stronger relation). Returns `(chunk, score)` sorted by score descending,
/// ties broken by chunk sequence order, earliest first.
pub fn expand(graph: &EntityGraph, seeds: &[Entity], hops: usize) -> Vec<(ChunkId, f64)> {
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut frontier: VecDeque<(&str, usize)> = VecDeque::new();
    for seed in seeds {
        let key = seed.normalized_key.as_str();
        if graph.contains_entity(key) && visited.insert(key) {
            frontier.push_back((key, 0));
        }
    }

    let mut traversed: BTreeSet<(String, String)> = BTreeSet::new();
    let mut scores: BTreeMap<ChunkId, f64> = BTreeMap::new();

    while let Some((key, depth)) = frontier.pop_front() {
        if depth >= hops {
            continue;
        }
        for (neighbor, edge) in graph.neighbors(key) {
            if traversed.insert(EntityGraph::edge_key(key, neighbor)) {
                for chunk_id in &edge.supporting_chunk_ids {
                    *scores.entry(chunk_id.clone()).or_insert(0.0) += edge.weight as f64;
                }
            }
            if visited.insert(neighbor) {
                frontier.push_back((neighbor, depth + 1));
            }
        }
    }

    // BTreeMap iteration is already in sequence order; the stable sort
    // keeps that order within equal scores
    let mut ranked: Vec<(ChunkId, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyrag_core::Chunk;

    fn chunk(doc: &str, i: u32) -> Chunk {
        Chunk::new(doc, i, format!("chunk {}", i))
    }

    fn entities(names: &[&str]) -> Vec<Entity> {
        names.iter().map(|n| Entity::new(*n)).collect()
    }

    /// Four chunks: the first two both mention Paris and Treaty, the last
    /// two share nothing.
    fn paris_treaty_fixture() -> (Vec<Chunk>, BTreeMap<ChunkId, Vec<Entity>>) {
        let chunks: Vec<Chunk> = (0..4).map(|i| chunk("doc", i)).collect();
        let mut per_chunk = BTreeMap::new();
        per_chunk.insert(chunks[0].id.clone(), entities(&["Paris", "Treaty"]));
        per_chunk.insert(chunks[1].id.clone(), entities(&["Paris", "Treaty"]));
        per_chunk.insert(chunks[2].id.clone(), entities(&["Desert"]));
        per_chunk.insert(chunks[3].id.clone(), entities(&["Ocean"]));
        (chunks, per_chunk)
    }

    #[test]
    fn test_single_edge_weight_and_support() {
        let (chunks, per_chunk) = paris_treaty_fixture();
        let graph = GraphBuilder::new().build(&chunks, &per_chunk);

        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edge("paris", "treaty").unwrap();
        assert_eq!(edge.weight, 2);
        assert_eq!(
            edge.supporting_chunk_ids,
            BTreeSet::from([ChunkId::new("doc", 0), ChunkId::new("doc", 1)])
        );
    }

    #[test]
    fn test_below_threshold_entities_excluded() {
        let (chunks, per_chunk) = paris_treaty_fixture();
        let graph = GraphBuilder::new().build(&chunks, &per_chunk);

        // Desert and Ocean each occur once; they are not in the graph at all
        assert!(!graph.contains_entity("desert"));
        assert!(!graph.contains_entity("ocean"));
        assert_eq!(graph.entity_count(), 2);
    }

    #[test]
    fn test_weight_equals_supporting_count() {
        let chunks: Vec<Chunk> = (0..3).map(|i| chunk("doc", i)).collect();
        let mut per_chunk = BTreeMap::new();
        for c in &chunks {
            per_chunk.insert(c.id.clone(), entities(&["Alpha", "Beta"]));
        }
        let graph = GraphBuilder::new().build(&chunks, &per_chunk);

        let edge = graph.edge("alpha", "beta").unwrap();
        assert_eq!(edge.weight, 3);
        assert_eq!(edge.weight as usize, edge.supporting_chunk_ids.len());
    }

    #[test]
    fn test_duplicate_mentions_in_one_chunk_count_once() {
        let chunks = vec![chunk("doc", 0), chunk("doc", 1)];
        let mut per_chunk = BTreeMap::new();
        // "Paris" twice in the same chunk via diacritic-free duplicates
        per_chunk.insert(
            chunks[0].id.clone(),
            entities(&["Paris", "Paris", "Treaty"]),
        );
        per_chunk.insert(chunks[1].id.clone(), entities(&["Paris", "Treaty"]));
        let graph = GraphBuilder::new().build(&chunks, &per_chunk);

        assert_eq!(graph.edge("paris", "treaty").unwrap().weight, 2);
    }

    #[test]
    fn test_empty_inputs_yield_empty_graph() {
        let graph = GraphBuilder::new().build(&[], &BTreeMap::new());
        assert!(graph.is_empty());

        // A chunk with no entities contributes nothing, without error
        let chunks = vec![chunk("doc", 0)];
        let mut per_chunk = BTreeMap::new();
        per_chunk.insert(chunks[0].id.clone(), Vec::new());
        let graph = GraphBuilder::new().build(&chunks, &per_chunk);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_determinism_across_runs() {
        let (chunks, per_chunk) = paris_treaty_fixture();
        let a = GraphBuilder::new().build(&chunks, &per_chunk);
        let b = GraphBuilder::new().build(&chunks, &per_chunk);

        assert_eq!(a.edges, b.edges);
        assert_eq!(a.entity_chunks, b.entity_chunks);
    }

    #[test]
    fn test_expand_scores_supporting_chunks() {
        let (chunks, per_chunk) = paris_treaty_fixture();
        let graph = GraphBuilder::new().build(&chunks, &per_chunk);

        let ranked = expand(&graph, &entities(&["Paris"]), 1);
        assert_eq!(ranked.len(), 2);
        // Equal scores fall back to sequence order
        assert_eq!(ranked[0].0, ChunkId::new("doc", 0));
        assert_eq!(ranked[1].0, ChunkId::new("doc", 1));
        assert_eq!(ranked[0].1, 2.0);
    }

    #[test]
    fn test_expand_two_hops_reaches_further() {
        // Alpha-Beta co-occur in chunks 0,1; Beta-Gamma co-occur in chunk 2.
        // Chunk 3 mentions Gamma again so it survives the threshold.
        let chunks: Vec<Chunk> = (0..4).map(|i| chunk("doc", i)).collect();
        let mut per_chunk = BTreeMap::new();
        per_chunk.insert(chunks[0].id.clone(), entities(&["Alpha", "Beta"]));
        per_chunk.insert(chunks[1].id.clone(), entities(&["Alpha", "Beta"]));
        per_chunk.insert(chunks[2].id.clone(), entities(&["Beta", "Gamma"]));
        per_chunk.insert(chunks[3].id.clone(), entities(&["Gamma"]));
        let graph = GraphBuilder::new().build(&chunks, &per_chunk);

        let one_hop = expand(&graph, &entities(&["Alpha"]), 1);
        assert!(one_hop.iter().all(|(id, _)| id.index != 2));

        let two_hops = expand(&graph, &entities(&["Alpha"]), 2);
        assert!(two_hops.iter().any(|(id, _)| id.index == 2));
    }

    #[test]
    fn test_expand_unknown_seed_is_empty() {
        let (chunks, per_chunk) = paris_treaty_fixture();
        let graph = GraphBuilder::new().build(&chunks, &per_chunk);
        assert!(expand(&graph, &entities(&["Atlantis"]), 1).is_empty());
    }
}
