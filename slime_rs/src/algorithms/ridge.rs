// src/algorithms/ridge.rs

use crate::core::{LabelFit, Result, SlimeError};
use crate::traits::LocalRegressor;
use crate::utils::{normalized_weights, weighted_r2_score};
use log::trace;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Below this many requested features `Auto` uses forward selection.
const AUTO_FORWARD_SELECTION_LIMIT: usize = 6;
/// Regularisation for the candidate fits scored during forward selection.
const FORWARD_SELECTION_ALPHA: f64 = 1e-8;
/// Regularisation for the fit that ranks features in `HighestWeights`.
const HIGHEST_WEIGHTS_ALPHA: f64 = 0.01;

/// How the surrogate picks at most `max_features` features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSelection {
    /// Forward selection for small budgets, highest weights otherwise.
    #[default]
    Auto,
    /// Use every feature regardless of the budget.
    All,
    /// Greedily add the feature that most improves the weighted R².
    ForwardSelection,
    /// Keep the features with the largest coefficients in a full fit.
    HighestWeights,
}

/// Weighted linear model with intercept.
#[derive(Debug, Clone)]
struct WeightedLinearModel {
    intercept: f64,
    coefficients: Array1<f64>,
}

impl WeightedLinearModel {
    fn predict(&self, features: ArrayView2<'_, f64>) -> Array1<f64> {
        features.dot(&self.coefficients) + self.intercept
    }
}

/// Weighted ridge regression surrogate.
///
/// Features and target are centred on their weighted means before solving
/// `(Xᵀ W X + alpha I) b = Xᵀ W y`, so the intercept is never penalised.
/// Sample weights are first divided by the largest one, so `alpha` is measured
/// against a heaviest sample of weight 1 and multiplying every weight by the
/// same factor changes neither the selected features nor the fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgeRegressor {
    alpha: f64,
    selection: FeatureSelection,
}

impl RidgeRegressor {
    pub const DEFAULT_ALPHA: f64 = 1.0;

    pub fn new(alpha: f64, selection: FeatureSelection) -> Result<Self> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(SlimeError::InvalidInput(format!(
                "Ridge alpha must be non-negative and finite, got {}.",
                alpha
            )));
        }
        Ok(RidgeRegressor { alpha, selection })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn selection(&self) -> FeatureSelection {
        self.selection
    }

    fn select_features(
        &self,
        features: ArrayView2<'_, f64>,
        target: ArrayView1<'_, f64>,
        weights: ArrayView1<'_, f64>,
        max_features: usize,
    ) -> Result<Vec<usize>> {
        let n_features = features.ncols();
        let method = match self.selection {
            FeatureSelection::All => return Ok((0..n_features).collect()),
            _ if max_features >= n_features => return Ok((0..n_features).collect()),
            FeatureSelection::Auto if max_features <= AUTO_FORWARD_SELECTION_LIMIT => {
                FeatureSelection::ForwardSelection
            }
            FeatureSelection::Auto => FeatureSelection::HighestWeights,
            other => other,
        };
        match method {
            FeatureSelection::ForwardSelection => {
                forward_selection(features, target, weights, max_features)
            }
            _ => highest_weights(features, target, weights, max_features),
        }
    }
}

impl Default for RidgeRegressor {
    fn default() -> Self {
        RidgeRegressor {
            alpha: Self::DEFAULT_ALPHA,
            selection: FeatureSelection::Auto,
        }
    }
}

impl LocalRegressor for RidgeRegressor {
    fn fit(
        &self,
        features: ArrayView2<'_, f64>,
        target: ArrayView1<'_, f64>,
        weights: ArrayView1<'_, f64>,
        max_features: usize,
    ) -> Result<LabelFit> {
        if features.nrows() != target.len() || features.nrows() != weights.len() {
            return Err(SlimeError::IncompatibleDimensions(format!(
                "Regression got {} feature rows, {} targets and {} weights.",
                features.nrows(),
                target.len(),
                weights.len()
            )));
        }
        if features.nrows() == 0 {
            return Err(SlimeError::InvalidInput(
                "Cannot fit a surrogate without samples.".to_string(),
            ));
        }
        if weights.iter().any(|&w| !w.is_finite() || w < 0.0) {
            return Err(SlimeError::InvalidInput(
                "Sample weights must be non-negative and finite.".to_string(),
            ));
        }

        let weights = normalized_weights(weights).unwrap_or_else(|| weights.to_owned());
        let weights = weights.view();

        let used = self.select_features(features, target, weights, max_features)?;
        let selected = features.select(Axis(1), &used);
        let model = solve_weighted_ridge(selected.view(), target, weights, self.alpha)?;
        let predicted = model.predict(selected.view());
        let score = weighted_r2_score(target, predicted.view(), weights);
        // every feature present
        let local_pred = model.intercept + model.coefficients.sum();

        let mut local_exp: Vec<(usize, f64)> = used
            .into_iter()
            .zip(model.coefficients.iter().copied())
            .collect();
        local_exp.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(LabelFit {
            intercept: model.intercept,
            local_exp,
            score,
            local_pred,
        })
    }
}

fn forward_selection(
    features: ArrayView2<'_, f64>,
    target: ArrayView1<'_, f64>,
    weights: ArrayView1<'_, f64>,
    max_features: usize,
) -> Result<Vec<usize>> {
    let mut used: Vec<usize> = Vec::with_capacity(max_features);
    for _ in 0..max_features.min(features.ncols()) {
        let mut best: Option<(usize, f64)> = None;
        let mut last_err = None;
        for candidate in (0..features.ncols()).filter(|f| !used.contains(f)) {
            let mut trial = used.clone();
            trial.push(candidate);
            let x = features.select(Axis(1), &trial);
            let model = match solve_weighted_ridge(x.view(), target, weights, FORWARD_SELECTION_ALPHA) {
                Ok(model) => model,
                Err(err) => {
                    last_err = Some(err);
                    continue;
                }
            };
            let score = weighted_r2_score(target, model.predict(x.view()).view(), weights);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }
        match (best, last_err) {
            (Some((feature, score)), _) => {
                trace!("forward selection added feature {} (score {:.4})", feature, score);
                used.push(feature);
            }
            (None, Some(err)) => return Err(err),
            (None, None) => break,
        }
    }
    Ok(used)
}

fn highest_weights(
    features: ArrayView2<'_, f64>,
    target: ArrayView1<'_, f64>,
    weights: ArrayView1<'_, f64>,
    max_features: usize,
) -> Result<Vec<usize>> {
    let model = solve_weighted_ridge(features, target, weights, HIGHEST_WEIGHTS_ALPHA)?;
    let mut ranked: Vec<(usize, f64)> = model.coefficients.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    trace!("highest weights ranking: {:?}", ranked);
    Ok(ranked.into_iter().take(max_features).map(|(i, _)| i).collect())
}

fn solve_weighted_ridge(
    features: ArrayView2<'_, f64>,
    target: ArrayView1<'_, f64>,
    weights: ArrayView1<'_, f64>,
    alpha: f64,
) -> Result<WeightedLinearModel> {
    let sum_weights = weights.sum();
    if sum_weights <= 0.0 {
        return Err(SlimeError::Solver("Sample weights sum to zero.".to_string()));
    }

    let feature_means = weights.dot(&features) / sum_weights;
    let target_mean = weights.dot(&target) / sum_weights;
    let centred = &features - &feature_means;
    let centred_target = &target - target_mean;

    let weighted = &centred * &weights.insert_axis(Axis(1));
    let mut gram = weighted.t().dot(&centred);
    for i in 0..gram.nrows() {
        gram[[i, i]] += alpha;
    }
    let rhs = weighted.t().dot(&centred_target);

    let coefficients = solve_symmetric(gram, rhs)?;
    let intercept = target_mean - feature_means.dot(&coefficients);
    Ok(WeightedLinearModel {
        intercept,
        coefficients,
    })
}

/// Solves `a x = b` for symmetric positive definite `a`.
fn solve_symmetric(a: Array2<f64>, b: Array1<f64>) -> Result<Array1<f64>> {
    if a.nrows() == 0 {
        return Ok(Array1::zeros(0));
    }

    #[cfg(feature = "linalg")]
    {
        use ndarray_linalg::Solve;
        a.solve_into(b)
            .map_err(|e| SlimeError::Solver(format!("Ridge system solve failed: {}", e)))
    }
    #[cfg(not(feature = "linalg"))]
    {
        cholesky_solve(&a, &b)
    }
}

#[cfg(not(feature = "linalg"))]
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return Err(SlimeError::Solver(
                        "Ridge system is not positive definite.".to_string(),
                    ));
                }
                l[[i, i]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    Ok(x)
}
