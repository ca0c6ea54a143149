// src/algorithms/lime.rs

use crate::algorithms::kernel::ExponentialKernel;
use crate::algorithms::ridge::{FeatureSelection, RidgeRegressor};
use crate::algorithms::sampling::{predict_in_batches, sample_feature_vectors, DEFAULT_BATCH_SIZE};
use crate::core::{Explanation, Result, SlimeError};
use crate::traits::{BinaryPerturber, DistanceMetric, LocalRegressor, Predictor};
use crate::utils::argmax;
use log::debug;
use ndarray::{Array1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for the explainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainerConfig {
    pub kernel_width: f64,
    /// Perturbed instances per predictor call.
    pub batch_size: usize,
    /// Seed for sampling. `None` seeds from system entropy.
    pub random_state: Option<u64>,
    pub feature_selection: FeatureSelection,
    pub ridge_alpha: f64,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        ExplainerConfig {
            kernel_width: ExponentialKernel::DEFAULT_WIDTH,
            batch_size: DEFAULT_BATCH_SIZE,
            random_state: None,
            feature_selection: FeatureSelection::Auto,
            ridge_alpha: RidgeRegressor::DEFAULT_ALPHA,
        }
    }
}

/// Which labels get a local surrogate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSelection {
    /// The `k` labels that are most often the arg-max across the sampled predictions.
    Top(usize),
    /// A fixed set of labels, explained in the given order.
    Explicit(Vec<usize>),
}

/// Per-call parameters of [`Explainer::explain_instance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainOptions {
    pub labels: LabelSelection,
    /// Feature vectors to draw. Only whole batches are predicted.
    pub num_samples: usize,
    /// Most features a surrogate may use.
    pub num_features: usize,
}

impl Default for ExplainOptions {
    fn default() -> Self {
        ExplainOptions {
            labels: LabelSelection::Top(5),
            num_samples: 10,
            num_features: 100,
        }
    }
}

impl ExplainOptions {
    pub fn with_top_labels(mut self, k: usize) -> Self {
        self.labels = LabelSelection::Top(k);
        self
    }

    pub fn with_labels(mut self, labels: Vec<usize>) -> Self {
        self.labels = LabelSelection::Explicit(labels);
        self
    }

    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    pub fn with_num_features(mut self, num_features: usize) -> Self {
        self.num_features = num_features;
        self
    }

    fn validate(&self, batch_size: usize) -> Result<()> {
        match &self.labels {
            LabelSelection::Top(0) => {
                return Err(SlimeError::InvalidInput(
                    "At least one top label must be requested.".to_string(),
                ))
            }
            LabelSelection::Explicit(labels) if labels.is_empty() => {
                return Err(SlimeError::InvalidInput(
                    "Explicit label list cannot be empty.".to_string(),
                ))
            }
            _ => {}
        }
        if self.num_samples == 0 {
            return Err(SlimeError::InvalidInput(
                "Number of samples must be at least 1.".to_string(),
            ));
        }
        if self.num_samples < batch_size {
            return Err(SlimeError::InvalidInput(format!(
                "{} samples never fill a batch of {}; nothing would be predicted.",
                self.num_samples, batch_size
            )));
        }
        Ok(())
    }
}

/// Resolves a [`LabelSelection`] against sampled predictions.
///
/// `Top(k)` counts every row's arg-max label and keeps the `k` most frequent;
/// equal counts keep the order in which the labels first appeared.
pub fn select_labels(selection: &LabelSelection, predictions: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
    match selection {
        LabelSelection::Top(k) => {
            let mut counts: Vec<(usize, usize)> = Vec::new();
            for (i, row) in predictions.rows().into_iter().enumerate() {
                let label = argmax(row).ok_or_else(|| {
                    if row.is_empty() {
                        SlimeError::ModelPredictionError(
                            "Predictor returned an empty prediction vector.".to_string(),
                        )
                    } else {
                        SlimeError::ModelPredictionError(format!(
                            "Predictor returned only NaN scores for sample {}.",
                            i
                        ))
                    }
                })?;
                match counts.iter_mut().find(|(l, _)| *l == label) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((label, 1)),
                }
            }
            counts.sort_by(|a, b| b.1.cmp(&a.1));
            let top: Vec<usize> = counts.into_iter().take(*k).map(|(label, _)| label).collect();
            if top.is_empty() {
                return Err(SlimeError::InvalidInput(
                    "No predictions to select labels from.".to_string(),
                ));
            }
            Ok(top)
        }
        LabelSelection::Explicit(labels) => {
            let mut selected = Vec::with_capacity(labels.len());
            for &label in labels {
                if label >= predictions.ncols() {
                    return Err(SlimeError::IncompatibleDimensions(format!(
                        "Label {} is outside the predictor's {} outputs.",
                        label,
                        predictions.ncols()
                    )));
                }
                if !selected.contains(&label) {
                    selected.push(label);
                }
            }
            if selected.is_empty() {
                return Err(SlimeError::InvalidInput(
                    "Explicit label list cannot be empty.".to_string(),
                ));
            }
            Ok(selected)
        }
    }
}

/// Explains a black-box predictor around one instance by sampling feature
/// perturbations and fitting a weighted local surrogate per label.
#[derive(Debug)]
pub struct Explainer<M, R = RidgeRegressor> {
    metric: M,
    kernel: ExponentialKernel,
    regressor: R,
    batch_size: usize,
    rng: StdRng,
}

impl<M: DistanceMetric> Explainer<M> {
    pub fn new(metric: M, config: Option<ExplainerConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        if config.batch_size == 0 {
            return Err(SlimeError::InvalidInput(
                "Batch size must be at least 1.".to_string(),
            ));
        }
        let kernel = ExponentialKernel::new(config.kernel_width)?;
        let regressor = RidgeRegressor::new(config.ridge_alpha, config.feature_selection)?;
        let rng = match config.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Explainer {
            metric,
            kernel,
            regressor,
            batch_size: config.batch_size,
            rng,
        })
    }
}

impl<M: DistanceMetric, R: LocalRegressor> Explainer<M, R> {
    /// Replaces the local regression solver.
    pub fn with_regressor<R2: LocalRegressor>(self, regressor: R2) -> Explainer<M, R2> {
        Explainer {
            metric: self.metric,
            kernel: self.kernel,
            regressor,
            batch_size: self.batch_size,
            rng: self.rng,
        }
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    pub fn kernel(&self) -> &ExponentialKernel {
        &self.kernel
    }

    pub fn regressor(&self) -> &R {
        &self.regressor
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Explains the instance held by `perturber`, drawing samples from the
    /// explainer's own random state, which advances on every call.
    pub fn explain_instance<P, Pr>(
        &mut self,
        perturber: P,
        predictor: &Pr,
        options: &ExplainOptions,
    ) -> Result<Explanation<P>>
    where
        P: BinaryPerturber,
        Pr: Predictor<P::Instance> + ?Sized,
    {
        let mut rng = self.rng.clone();
        let result = self.explain_instance_with_rng(&mut rng, perturber, predictor, options);
        self.rng = rng;
        result
    }

    /// Like [`explain_instance`](Self::explain_instance) with a caller-owned random state.
    ///
    /// Calls `predictor` once on the fully suppressed base instance and then
    /// once per full batch of perturbations; a failing call aborts the whole
    /// explanation.
    pub fn explain_instance_with_rng<P, Pr, G>(
        &self,
        rng: &mut G,
        perturber: P,
        predictor: &Pr,
        options: &ExplainOptions,
    ) -> Result<Explanation<P>>
    where
        P: BinaryPerturber,
        Pr: Predictor<P::Instance> + ?Sized,
        G: Rng + ?Sized,
    {
        options.validate(self.batch_size)?;

        let base = perturber.base()?;
        let baseline = predictor.predict(std::slice::from_ref(&base))?;
        if baseline.nrows() != 1 {
            return Err(SlimeError::ModelPredictionError(format!(
                "Predictor returned {} rows for the base instance.",
                baseline.nrows()
            )));
        }

        let features = sample_feature_vectors(rng, options.num_samples, perturber.feature_count());
        let samples = predict_in_batches(&perturber, predictor, features, self.batch_size)?;
        if samples.num_labels() != baseline.ncols() {
            return Err(SlimeError::IncompatibleDimensions(format!(
                "Base prediction has {} labels, sample predictions have {}.",
                baseline.ncols(),
                samples.num_labels()
            )));
        }

        let baseline_row = baseline.row(0);
        let distances: Array1<f64> = samples
            .predictions()
            .rows()
            .into_iter()
            .map(|row| self.metric.distance(baseline_row, row))
            .collect();
        if let Some(i) = distances.iter().position(|d| !d.is_finite()) {
            return Err(SlimeError::InvalidInput(format!(
                "Distance metric returned {} for sample {}.",
                distances[i], i
            )));
        }
        let weights = self.kernel.weights(distances.view());

        let labels = select_labels(&options.labels, samples.predictions())?;
        debug!("explaining labels {:?} over {} samples", labels, samples.len());

        let design = samples.design_matrix();
        let mut explanation = Explanation::new(perturber, labels.clone());
        for &label in &labels {
            let target = samples.label_column(label)?;
            let fit = self
                .regressor
                .fit(design.view(), target, weights.view(), options.num_features)?;
            debug!(
                "label {}: score {:.4}, intercept {:.4}, {} features",
                label,
                fit.score,
                fit.intercept,
                fit.local_exp.len()
            );
            explanation.insert(label, fit);
        }
        Ok(explanation)
    }
}
