//! Score fusion and ranking
//!
//! The three signals live in incomparable score spaces (cosine similarity,
//! traversed edge weight, cluster similarity), so every cross-signal
//! combination normalizes per signal first; raw scores are never compared
//! across signal types.

use hyrag_core::{ChunkId, RetrievalResult, Signal};
use std::collections::BTreeMap;

/// Min-max normalize scores to [0, 1] within one signal's result set.
///
/// A constant-score set maps to all 1.0: every hit was that signal's best.
pub fn min_max_normalize(results: &mut [RetrievalResult]) {
    let Some(first) = results.first() else {
        return;
    };
    let mut min = first.score;
    let mut max = first.score;
    for r in results.iter() {
        min = min.min(r.score);
        max = max.max(r.score);
    }
    let range = max - min;
    for r in results.iter_mut() {
        r.score = if range == 0.0 {
            1.0
        } else {
            (r.score - min) / range
        };
    }
}

/// Keep one result per chunk, preferring the highest score.
///
/// Used by raptor mode, where a chunk can arrive through several summary
/// nodes. Order and ranks are reassigned afterwards.
pub fn dedup_keep_highest(results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
    let mut best: BTreeMap<ChunkId, RetrievalResult> = BTreeMap::new();
    for r in results {
        match best.get(&r.chunk_id) {
            Some(existing) if existing.score >= r.score => {}
            _ => {
                best.insert(r.chunk_id.clone(), r);
            }
        }
    }
    best.into_values().collect()
}

/// Combine two normalized signals into one ranking.
///
/// Per chunk the combined score is the weighted mean over the signals that
/// actually produced it - a chunk found by only one signal keeps that
/// signal's score, with no penalty for absence from the other.
pub fn fuse_weighted(
    vector: Vec<RetrievalResult>,
    graph: Vec<RetrievalResult>,
    vector_weight: f64,
    graph_weight: f64,
) -> Vec<RetrievalResult> {
    struct Partial {
        weighted_sum: f64,
        weight_total: f64,
        source: Signal,
    }

    let mut merged: BTreeMap<ChunkId, Partial> = BTreeMap::new();
    for (results, weight) in [(vector, vector_weight), (graph, graph_weight)] {
        for r in results {
            merged
                .entry(r.chunk_id)
                .and_modify(|p| {
                    p.weighted_sum += r.score * weight;
                    p.weight_total += weight;
                })
                .or_insert(Partial {
                    weighted_sum: r.score * weight,
                    weight_total: weight,
                    source: r.source,
                });
        }
    }

    let mut fused: Vec<RetrievalResult> = merged
        .into_iter()
        .map(|(chunk_id, p)| RetrievalResult {
            chunk_id,
            score: if p.weight_total == 0.0 {
                0.0
            } else {
                p.weighted_sum / p.weight_total
            },
            source: p.source,
            rank: 0,
        })
        .collect();

    // BTreeMap iteration is sequence order; the stable sort preserves it
    // within equal combined scores
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    assign_ranks(&mut fused);
    fused
}

/// Sort by score descending with sequence-order tie-break, then number
/// ranks from 1.
pub fn rank(mut results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    assign_ranks(&mut results);
    results
}

fn assign_ranks(results: &mut [RetrievalResult]) {
    for (i, r) in results.iter_mut().enumerate() {
        r.rank = i + 1;
    }
}
