// src/utils.rs
use ndarray::{Array1, ArrayView1};

/// Last path segment of a type's name, without generic arguments.
/// `slime_rs::transform::SegmentTransformer<ndarray::Dim<[usize; 2]>>` becomes `SegmentTransformer`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    head.rsplit("::").next().unwrap_or(head)
}

/// Index of the first maximum. NaN entries never win. `None` for an empty row.
pub fn argmax(values: ArrayView1<'_, f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b || v.is_nan() => {}
            None if v.is_nan() => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// `weights` divided by their largest entry, or `None` when no weight is positive.
///
/// Weighted statistics built on the result are unchanged when every weight is
/// multiplied by the same positive factor, however small.
pub fn normalized_weights(weights: ArrayView1<'_, f64>) -> Option<Array1<f64>> {
    let max = weights.fold(0.0_f64, |m, &w| m.max(w));
    if max > 0.0 && max.is_finite() {
        Some(weights.mapv(|w| w / max))
    } else {
        None
    }
}

/// Falls back to the unweighted mean when no weight is positive.
pub fn weighted_mean(values: ArrayView1<'_, f64>, weights: ArrayView1<'_, f64>) -> f64 {
    match normalized_weights(weights) {
        Some(w) => values.dot(&w) / w.sum(),
        None => values.mean().unwrap_or(0.0),
    }
}

/// Weighted coefficient of determination.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
/// "Constant" is judged relative to the target's weighted magnitude, so the
/// score only depends on the relative sizes of the weights.
pub fn weighted_r2_score(
    target: ArrayView1<'_, f64>,
    predicted: ArrayView1<'_, f64>,
    weights: ArrayView1<'_, f64>,
) -> f64 {
    let weights = normalized_weights(weights).unwrap_or_else(|| Array1::ones(target.len()));
    let mean = weighted_mean(target, weights.view());
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    let mut ss_mag = 0.0;
    for ((&y, &y_hat), &w) in target.iter().zip(predicted.iter()).zip(weights.iter()) {
        ss_res += w * (y - y_hat).powi(2);
        ss_tot += w * (y - mean).powi(2);
        ss_mag += w * y * y;
    }
    let tolerance = f64::EPSILON * ss_mag;
    if ss_tot <= tolerance {
        return if ss_res <= tolerance { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
