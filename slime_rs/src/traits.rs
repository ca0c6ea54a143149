// src/traits.rs

//! Capability interfaces the explainer is written against. Callers supply the
//! instance domain (transformers, perturbers, predictor) and may swap the
//! distance metric or the local regression solver.

use crate::core::{LabelFit, Predictions, Result};
use crate::utils::short_type_name;
use ndarray::{ArrayView1, ArrayView2};

/// A pure mapping from an instance to a modified instance, e.g. masking out
/// one image region.
pub trait Transformer<I> {
    fn transform(&self, instance: I) -> Result<I>;

    /// Display name of the transformation. Not used for equality or ordering.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

/// Produces perturbed instances by switching features on and off.
///
/// Position `i` of an enable-vector set to `false` means feature `i` is
/// suppressed (its transformation is applied); `true` leaves it as in the
/// original instance.
pub trait BinaryPerturber {
    type Instance: Clone;

    /// The number of features that can be perturbed.
    fn feature_count(&self) -> usize;

    /// Must fail with `SlimeError::InvalidInput` when
    /// `enabled_features.len() != self.feature_count()`.
    fn perturb(&self, enabled_features: &[bool]) -> Result<Self::Instance>;

    /// The reference instance with every feature removed.
    fn base(&self) -> Result<Self::Instance> {
        self.perturb(&vec![false; self.feature_count()])
    }
}

impl<P: BinaryPerturber + ?Sized> BinaryPerturber for &P {
    type Instance = P::Instance;

    fn feature_count(&self) -> usize {
        (**self).feature_count()
    }

    fn perturb(&self, enabled_features: &[bool]) -> Result<Self::Instance> {
        (**self).perturb(enabled_features)
    }

    fn base(&self) -> Result<Self::Instance> {
        (**self).base()
    }
}

/// The black-box model being explained.
///
/// Returns one row per instance and one column per label. Called repeatedly
/// with varying batch sizes.
pub trait Predictor<I> {
    fn predict(&self, instances: &[I]) -> Result<Predictions>;
}

impl<I, F> Predictor<I> for F
where
    F: Fn(&[I]) -> Result<Predictions>,
{
    fn predict(&self, instances: &[I]) -> Result<Predictions> {
        self(instances)
    }
}

/// Distance between the baseline prediction and a sample prediction.
pub trait DistanceMetric {
    fn distance(&self, baseline: ArrayView1<'_, f64>, prediction: ArrayView1<'_, f64>) -> f64;
}

impl<F> DistanceMetric for F
where
    F: Fn(ArrayView1<'_, f64>, ArrayView1<'_, f64>) -> f64,
{
    fn distance(&self, baseline: ArrayView1<'_, f64>, prediction: ArrayView1<'_, f64>) -> f64 {
        self(baseline, prediction)
    }
}

/// Weighted local regression used to fit the surrogate for one label.
///
/// `features` holds 0.0/1.0 regressors, `weights` are non-negative sample
/// weights and at most `max_features` features may appear in the result.
pub trait LocalRegressor {
    fn fit(
        &self,
        features: ArrayView2<'_, f64>,
        target: ArrayView1<'_, f64>,
        weights: ArrayView1<'_, f64>,
        max_features: usize,
    ) -> Result<LabelFit>;
}
