// src/core/explanation.rs
use super::data::LabelFit;
use super::errors::{Result, SlimeError};
use crate::traits::BinaryPerturber;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which signs of surrogate weight a [`FeatureFilter`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSign {
    Positive,
    Negative,
    Any,
}

/// Chooses which fitted features stay visible in a reconstructed explanation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureFilter {
    pub num_features: usize,
    /// Minimum weight magnitude a feature needs to be kept.
    pub min_weight: f64,
    pub sign: WeightSign,
}

impl FeatureFilter {
    /// The top `num_features` features with non-negative weight.
    pub fn positive(num_features: usize) -> Self {
        FeatureFilter {
            num_features,
            min_weight: 0.0,
            sign: WeightSign::Positive,
        }
    }

    pub fn negative(num_features: usize) -> Self {
        FeatureFilter {
            num_features,
            min_weight: 0.0,
            sign: WeightSign::Negative,
        }
    }

    pub fn any(num_features: usize) -> Self {
        FeatureFilter {
            num_features,
            min_weight: 0.0,
            sign: WeightSign::Any,
        }
    }

    pub fn with_min_weight(mut self, min_weight: f64) -> Self {
        self.min_weight = min_weight;
        self
    }

    fn keeps(&self, weight: f64) -> bool {
        match self.sign {
            WeightSign::Positive => weight >= 0.0 && weight >= self.min_weight,
            WeightSign::Negative => weight < 0.0 && -weight >= self.min_weight,
            WeightSign::Any => weight.abs() >= self.min_weight,
        }
    }
}

/// The local surrogates fitted around one instance, one per explained label.
///
/// Owns the perturber it was generated with so explanations can be rendered
/// back into the instance domain.
#[derive(Debug)]
pub struct Explanation<P> {
    perturber: P,
    top_labels: Vec<usize>,
    fits: BTreeMap<usize, LabelFit>,
}

impl<P: BinaryPerturber> Explanation<P> {
    pub fn new(perturber: P, top_labels: Vec<usize>) -> Self {
        Explanation {
            perturber,
            top_labels,
            fits: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, label: usize, fit: LabelFit) {
        self.fits.insert(label, fit);
    }

    pub fn perturber(&self) -> &P {
        &self.perturber
    }

    pub fn into_perturber(self) -> P {
        self.perturber
    }

    /// Labels selected for explanation, most frequent first.
    pub fn top_labels(&self) -> &[usize] {
        &self.top_labels
    }

    pub fn fit(&self, label: usize) -> Result<&LabelFit> {
        self.fits
            .get(&label)
            .ok_or(SlimeError::LabelNotExplained(label))
    }

    pub fn local_exp(&self, label: usize) -> Result<&[(usize, f64)]> {
        Ok(&self.fit(label)?.local_exp)
    }

    pub fn intercept(&self, label: usize) -> Result<f64> {
        Ok(self.fit(label)?.intercept)
    }

    pub fn score(&self, label: usize) -> Result<f64> {
        Ok(self.fit(label)?.score)
    }

    pub fn local_pred(&self, label: usize) -> Result<f64> {
        Ok(self.fit(label)?.local_pred)
    }

    /// Enable-vector keeping the features `filter` selects, in rank order.
    pub fn feature_mask(&self, label: usize, filter: &FeatureFilter) -> Result<Vec<bool>> {
        let fit = self.fit(label)?;
        let feature_count = self.perturber.feature_count();
        let mut enabled = vec![false; feature_count];
        let kept = fit
            .local_exp
            .iter()
            .filter(|(_, weight)| filter.keeps(*weight))
            .take(filter.num_features);
        for &(feature, _) in kept {
            if feature >= feature_count {
                return Err(SlimeError::IncompatibleDimensions(format!(
                    "Fit for label {} references feature {}, but the perturber has {} features.",
                    label, feature, feature_count
                )));
            }
            enabled[feature] = true;
        }
        Ok(enabled)
    }

    /// The instance with only the top `num_features` positively contributing
    /// features left in place and every other feature suppressed.
    pub fn explain(&self, label: usize, num_features: usize) -> Result<P::Instance> {
        self.explain_with(label, &FeatureFilter::positive(num_features))
    }

    pub fn explain_with(&self, label: usize, filter: &FeatureFilter) -> Result<P::Instance> {
        let enabled = self.feature_mask(label, filter)?;
        self.perturber.perturb(&enabled)
    }
}

impl<P> fmt::Display for Explanation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Explanation:")?;
        writeln!(f, "  Top Labels: {:?}", self.top_labels)?;
        for (label, fit) in &self.fits {
            writeln!(f, "Label {}:", label)?;
            write!(f, "{}", fit)?;
        }
        Ok(())
    }
}
