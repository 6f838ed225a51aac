//! Embedding arithmetic shared by the tree builder and the router

use crate::{CoreError, Result};

/// Cosine similarity between two vectors of equal dimension.
///
/// Returns 0.0 when either vector has zero norm, so all-zero embeddings
/// rank last instead of poisoning the ordering with NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Component-wise mean of a set of vectors.
///
/// Empty input yields an empty vector; callers treat that as "no centroid".
pub fn centroid(vectors: &[&[f32]]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let mut sum = vec![0.0f32; first.len()];
    for v in vectors {
        for (acc, x) in sum.iter_mut().zip(v.iter()) {
            *acc += x;
        }
    }
    let n = vectors.len() as f32;
    for acc in sum.iter_mut() {
        *acc /= n;
    }
    sum
}

/// Guard the hard compatibility invariant: a query embedding must live in
/// the same space as the indexed embeddings.
pub fn ensure_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(CoreError::EmbeddingDimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_centroid() {
        let a = [0.0f32, 2.0];
        let b = [2.0f32, 0.0];
        let c = centroid(&[&a, &b]);
        assert_eq!(c, vec![1.0, 1.0]);
    }

    #[test]
    fn test_centroid_empty() {
        assert!(centroid(&[]).is_empty());
    }

    #[test]
    fn test_ensure_dimension() {
        assert!(ensure_dimension(4, 4).is_ok());
        let err = ensure_dimension(4, 3).unwrap_err();
        assert!(matches!(
            err,
            CoreError::EmbeddingDimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }
}
