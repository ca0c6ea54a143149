// src/core/data.rs
use super::errors::{Result, SlimeError};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampled feature vectors, one row per perturbation.
/// `true` means the feature is present, `false` means its transformation was applied.
pub type FeatureMatrix = Array2<bool>;

/// Predictor output: one row per instance, one column per label.
pub type Predictions = Array2<f64>;

/// Feature vectors paired row-for-row with the predictions made on the
/// perturbed instances they describe.
#[derive(Debug, Clone)]
pub struct SampleSet {
    features: FeatureMatrix,
    predictions: Predictions,
}

impl SampleSet {
    pub fn new(features: FeatureMatrix, predictions: Predictions) -> Result<Self> {
        if features.nrows() != predictions.nrows() {
            return Err(SlimeError::IncompatibleDimensions(format!(
                "Sample set has {} feature rows but {} prediction rows.",
                features.nrows(),
                predictions.nrows()
            )));
        }
        Ok(SampleSet {
            features,
            predictions,
        })
    }

    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn feature_count(&self) -> usize {
        self.features.ncols()
    }

    pub fn num_labels(&self) -> usize {
        self.predictions.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, bool> {
        self.features.view()
    }

    pub fn predictions(&self) -> ArrayView2<'_, f64> {
        self.predictions.view()
    }

    pub fn prediction(&self, row: usize) -> ArrayView1<'_, f64> {
        self.predictions.row(row)
    }

    /// The feature matrix as 0.0/1.0 regressors.
    pub fn design_matrix(&self) -> Array2<f64> {
        self.features.mapv(|enabled| if enabled { 1.0 } else { 0.0 })
    }

    /// Every sample's prediction for one label.
    pub fn label_column(&self, label: usize) -> Result<ArrayView1<'_, f64>> {
        if label >= self.num_labels() {
            return Err(SlimeError::IncompatibleDimensions(format!(
                "Label {} is outside the predictor's {} outputs.",
                label,
                self.num_labels()
            )));
        }
        Ok(self.predictions.index_axis(Axis(1), label))
    }
}

/// The local surrogate fitted for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelFit {
    pub intercept: f64,
    /// (feature index, coefficient), most positive contribution first.
    pub local_exp: Vec<(usize, f64)>,
    /// Weighted R² of the surrogate on the samples it was fit on.
    pub score: f64,
    /// Surrogate prediction with every feature present, i.e. at the
    /// unperturbed instance. Not evaluated at any sampled row, so it does not
    /// depend on which vector happened to be drawn first.
    pub local_pred: f64,
}

impl fmt::Display for LabelFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Intercept:        {:.4}", self.intercept)?;
        writeln!(f, "  Score:            {:.4}", self.score)?;
        writeln!(f, "  Local Prediction: {:.4}", self.local_pred)?;
        writeln!(f, "  Feature Weights:")?;
        for (feature, weight) in self.local_exp.iter().take(10) {
            writeln!(f, "    Feature {}: {:.4}", feature, weight)?;
        }
        if self.local_exp.len() > 10 {
            writeln!(f, "    ...")?;
        }
        Ok(())
    }
}
