//! Seeded k-means used by the tree builder
//!
//! Lloyd's algorithm with k-means++ initialization, driven by a seeded RNG
//! so that identical input always yields identical partitions. All
//! tie-breaks resolve to the lowest index.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic k-means over plain embedding vectors.
#[derive(Debug, Clone)]
pub struct Kmeans {
    k: usize,
    max_iter: usize,
    seed: u64,
}

impl Kmeans {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            max_iter: 100,
            seed,
        }
    }

    /// Builder: set maximum Lloyd iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Assign each point to one of `k` clusters.
    ///
    /// `k` is clamped to the point count. Returns one label per point;
    /// labels are cluster indexes in `0..effective_k`.
    pub fn fit_predict(&self, points: &[Vec<f32>]) -> Vec<usize> {
        let n = points.len();
        if n == 0 {
            return Vec::new();
        }
        let k = self.k.clamp(1, n);
        if k == 1 {
            return vec![0; n];
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = self.init_centroids(points, k, &mut rng);
        let mut labels = vec![0usize; n];

        for _ in 0..self.max_iter {
            // Assign: each point to its nearest centroid, lowest index wins ties
            let mut changed = false;
            for (i, point) in points.iter().enumerate() {
                let mut best = 0usize;
                let mut best_dist = f32::MAX;
                for (c, centroid) in centroids.iter().enumerate() {
                    let dist = squared_distance(point, centroid);
                    if dist < best_dist {
                        best_dist = dist;
                        best = c;
                    }
                }
                if labels[i] != best {
                    labels[i] = best;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            // Update: centroid = mean of assigned points; an emptied cluster
            // keeps its previous centroid
            let dim = points[0].len();
            let mut sums = vec![vec![0.0f32; dim]; k];
            let mut counts = vec![0usize; k];
            for (point, &label) in points.iter().zip(labels.iter()) {
                counts[label] += 1;
                for (acc, x) in sums[label].iter_mut().zip(point.iter()) {
                    *acc += x;
                }
            }
            for c in 0..k {
                if counts[c] == 0 {
                    continue;
                }
                for acc in sums[c].iter_mut() {
                    *acc /= counts[c] as f32;
                }
                centroids[c] = std::mem::take(&mut sums[c]);
            }
        }

        labels
    }

    /// K-means++ initialization: first centroid sampled uniformly, the rest
    /// proportional to squared distance from the nearest chosen centroid.
    fn init_centroids(&self, points: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
        let n = points.len();
        let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);

        let first = rng.random_range(0..n);
        centroids.push(points[first].clone());

        while centroids.len() < k {
            let distances: Vec<f32> = points
                .iter()
                .map(|p| {
                    centroids
                        .iter()
                        .map(|c| squared_distance(p, c))
                        .fold(f32::MAX, f32::min)
                })
                .collect();

            let total: f32 = distances.iter().sum();
            if total == 0.0 {
                // All remaining points coincide with chosen centroids
                let idx = rng.random_range(0..n);
                centroids.push(points[idx].clone());
                continue;
            }

            let threshold = rng.random::<f32>() * total;
            let mut cumsum = 0.0;
            let mut selected = n - 1;
            for (j, d) in distances.iter().enumerate() {
                cumsum += d;
                if cumsum >= threshold {
                    selected = j;
                    break;
                }
            }
            centroids.push(points[selected].clone());
        }

        centroids
    }
}

/// Squared Euclidean distance
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
