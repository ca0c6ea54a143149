// src/algorithms/kernel.rs

use crate::core::{Result, SlimeError};
use ndarray::{Array1, ArrayView1};

/// Turns prediction distances into sample weights.
///
/// `weight(d) = sqrt(exp(-(d / width)^2))`, evaluated as `exp(-0.5 * (d / width)^2)`
/// so it underflows later. Equals 1.0 at zero distance and strictly decreases
/// up to about `37.6 * width`. Results are clamped to `f64::MIN_POSITIVE`, so
/// every sample keeps a positive weight and every distance beyond that point
/// gets the same constant weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialKernel {
    width: f64,
}

impl ExponentialKernel {
    pub const DEFAULT_WIDTH: f64 = 0.25;

    pub fn new(width: f64) -> Result<Self> {
        if !width.is_finite() || width <= 0.0 {
            return Err(SlimeError::InvalidInput(format!(
                "Kernel width must be positive and finite, got {}.",
                width
            )));
        }
        Ok(ExponentialKernel { width })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn weight(&self, distance: f64) -> f64 {
        let scaled = distance / self.width;
        (-0.5 * scaled * scaled).exp().max(f64::MIN_POSITIVE)
    }

    pub fn weights(&self, distances: ArrayView1<'_, f64>) -> Array1<f64> {
        distances.mapv(|d| self.weight(d))
    }
}

impl Default for ExponentialKernel {
    fn default() -> Self {
        ExponentialKernel {
            width: Self::DEFAULT_WIDTH,
        }
    }
}
