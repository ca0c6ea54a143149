// src/algorithms/distance.rs

use crate::traits::DistanceMetric;
use ndarray::ArrayView1;

/// L2 distance between two prediction vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl DistanceMetric for Euclidean {
    fn distance(&self, baseline: ArrayView1<'_, f64>, prediction: ArrayView1<'_, f64>) -> f64 {
        baseline
            .iter()
            .zip(prediction.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Cosine distance, `1 - cos(angle)`, in `[0, 2]`.
///
/// Two zero vectors are at distance 0; a zero vector and a non-zero one at distance 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl DistanceMetric for Cosine {
    fn distance(&self, baseline: ArrayView1<'_, f64>, prediction: ArrayView1<'_, f64>) -> f64 {
        let norm_a = baseline.dot(&baseline).sqrt();
        let norm_b = prediction.dot(&prediction).sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return if norm_a == norm_b { 0.0 } else { 1.0 };
        }
        let cosine = baseline.dot(&prediction) / (norm_a * norm_b);
        1.0 - cosine.clamp(-1.0, 1.0)
    }
}
