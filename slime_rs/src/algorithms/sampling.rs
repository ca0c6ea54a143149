// src/algorithms/sampling.rs

//! Drawing random feature vectors and querying the predictor on the
//! perturbed instances they describe.

use crate::core::{FeatureMatrix, Result, SampleSet, SlimeError};
use crate::traits::{BinaryPerturber, Predictor};
use log::{debug, warn};
use ndarray::{s, Array2};
use rand::Rng;

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Draws `num_samples` feature vectors of length `feature_count`, every flag an
/// independent fair coin. The random source is advanced by exactly
/// `num_samples * feature_count` draws, row by row.
pub fn sample_feature_vectors<R: Rng + ?Sized>(
    rng: &mut R,
    num_samples: usize,
    feature_count: usize,
) -> FeatureMatrix {
    Array2::from_shape_simple_fn((num_samples, feature_count), || rng.gen::<bool>())
}

/// Perturbs the instance once per row of `features` and predicts in batches
/// of `batch_size`, one predictor call per full batch, in row order.
///
/// A trailing batch smaller than `batch_size` is never predicted; its rows are
/// dropped from the returned sample set so features and predictions stay
/// aligned.
pub fn predict_in_batches<P, Pr>(
    perturber: &P,
    predictor: &Pr,
    features: FeatureMatrix,
    batch_size: usize,
) -> Result<SampleSet>
where
    P: BinaryPerturber + ?Sized,
    Pr: Predictor<P::Instance> + ?Sized,
{
    if batch_size == 0 {
        return Err(SlimeError::InvalidInput("Batch size must be at least 1.".to_string()));
    }
    if features.ncols() != perturber.feature_count() {
        return Err(SlimeError::InvalidInput(format!(
            "Feature vectors have {} columns, but the perturber has {} features.",
            features.ncols(),
            perturber.feature_count()
        )));
    }

    let mut batch = Vec::with_capacity(batch_size);
    let mut flat_predictions: Vec<f64> = Vec::new();
    let mut num_labels: Option<usize> = None;
    let mut retained = 0;

    for row in features.rows() {
        batch.push(perturber.perturb(&row.to_vec())?);
        if batch.len() < batch_size {
            continue;
        }

        let batch_predictions = predictor.predict(&batch)?;
        if batch_predictions.nrows() != batch.len() {
            return Err(SlimeError::ModelPredictionError(format!(
                "Predictor returned {} rows for a batch of {} instances.",
                batch_predictions.nrows(),
                batch.len()
            )));
        }
        let width = *num_labels.get_or_insert(batch_predictions.ncols());
        if batch_predictions.ncols() != width {
            return Err(SlimeError::IncompatibleDimensions(format!(
                "Predictor returned {} labels, earlier batches had {}.",
                batch_predictions.ncols(),
                width
            )));
        }

        flat_predictions.extend(batch_predictions.iter().copied());
        retained += batch.len();
        debug!("predicted batch of {} ({} samples so far)", batch.len(), retained);
        batch.clear();
    }

    if !batch.is_empty() {
        warn!(
            "dropping trailing partial batch of {} samples (batch size {})",
            batch.len(),
            batch_size
        );
    }

    let predictions = Array2::from_shape_vec((retained, num_labels.unwrap_or(0)), flat_predictions)?;
    let features = features.slice(s![..retained, ..]).to_owned();
    SampleSet::new(features, predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{SegmentTransformer, TransformerPerturber};
    use crate::traits::Transformer;
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::{Cell, RefCell};

    fn one_hot_perturber(features: usize) -> TransformerPerturber<Array1<f64>> {
        let transformers: Vec<Box<dyn Transformer<Array1<f64>>>> = (0..features)
            .map(|i| {
                let mut mask = Array1::ones(features);
                mask[i] = 0.0;
                Box::new(SegmentTransformer::new(mask)) as Box<dyn Transformer<Array1<f64>>>
            })
            .collect();
        TransformerPerturber::new(Array1::ones(features), transformers)
    }

    #[test]
    fn sampling_is_reproducible_for_a_seed() {
        let a = sample_feature_vectors(&mut StdRng::seed_from_u64(7), 20, 6);
        let b = sample_feature_vectors(&mut StdRng::seed_from_u64(7), 20, 6);
        assert_eq!(a, b);
        assert_eq!(a.dim(), (20, 6));
    }

    #[test]
    fn sampling_advances_the_random_state() {
        let mut rng = StdRng::seed_from_u64(7);
        let first = sample_feature_vectors(&mut rng, 20, 6);
        let second = sample_feature_vectors(&mut rng, 20, 6);
        assert_ne!(first, second);
    }

    #[test]
    fn sampling_is_roughly_balanced() {
        let samples = sample_feature_vectors(&mut StdRng::seed_from_u64(1), 500, 8);
        let enabled = samples.iter().filter(|&&b| b).count() as f64;
        let fraction = enabled / samples.len() as f64;
        assert!((fraction - 0.5).abs() < 0.05, "fraction enabled {}", fraction);
    }

    #[test]
    fn trailing_partial_batch_is_dropped() -> Result<()> {
        let perturber = one_hot_perturber(3);
        let calls = Cell::new(0);
        let predict = |batch: &[Array1<f64>]| -> Result<Array2<f64>> {
            calls.set(calls.get() + 1);
            let sums: Vec<f64> = batch.iter().map(|x| x.sum()).collect();
            Ok(Array2::from_shape_vec((batch.len(), 1), sums)?)
        };
        let features = sample_feature_vectors(&mut StdRng::seed_from_u64(3), 25, 3);
        let samples = predict_in_batches(&perturber, &predict, features.clone(), DEFAULT_BATCH_SIZE)?;

        assert_eq!(calls.get(), 2);
        assert_eq!(samples.len(), 20);
        assert_eq!(samples.predictions().nrows(), 20);
        assert_eq!(samples.features(), features.slice(s![..20, ..]));
        Ok(())
    }

    #[test]
    fn predictions_follow_sample_order() -> Result<()> {
        let perturber = one_hot_perturber(4);
        let batch_sizes = RefCell::new(Vec::new());
        let predict = |batch: &[Array1<f64>]| -> Result<Array2<f64>> {
            batch_sizes.borrow_mut().push(batch.len());
            let sums: Vec<f64> = batch.iter().map(|x| x.sum()).collect();
            Ok(Array2::from_shape_vec((batch.len(), 1), sums)?)
        };
        let features = sample_feature_vectors(&mut StdRng::seed_from_u64(11), 12, 4);
        let samples = predict_in_batches(&perturber, &predict, features, 3)?;

        assert_eq!(*batch_sizes.borrow(), vec![3, 3, 3, 3]);
        for i in 0..samples.len() {
            let active = samples.features().row(i).iter().filter(|&&b| b).count() as f64;
            assert_eq!(samples.prediction(i)[0], active);
        }
        Ok(())
    }

    #[test]
    fn wrong_row_count_from_predictor_is_an_error() {
        let perturber = one_hot_perturber(2);
        let predict = |_: &[Array1<f64>]| -> Result<Array2<f64>> { Ok(Array2::zeros((1, 2))) };
        let features = sample_feature_vectors(&mut StdRng::seed_from_u64(0), 4, 2);
        let err = predict_in_batches(&perturber, &predict, features, 2).unwrap_err();
        assert!(matches!(err, SlimeError::ModelPredictionError(_)));
    }

    #[test]
    fn predictor_errors_abort_sampling() {
        let perturber = one_hot_perturber(2);
        let calls = Cell::new(0);
        let predict = |batch: &[Array1<f64>]| -> Result<Array2<f64>> {
            calls.set(calls.get() + 1);
            if calls.get() == 2 {
                return Err(SlimeError::ModelPredictionError("model offline".to_string()));
            }
            Ok(Array2::zeros((batch.len(), 2)))
        };
        let features = sample_feature_vectors(&mut StdRng::seed_from_u64(0), 10, 2);
        let err = predict_in_batches(&perturber, &predict, features, 2).unwrap_err();
        assert!(err.to_string().contains("model offline"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn rejects_zero_batch_size_and_wrong_width() {
        let perturber = one_hot_perturber(2);
        let predict = |batch: &[Array1<f64>]| -> Result<Array2<f64>> { Ok(Array2::zeros((batch.len(), 1))) };
        let features = sample_feature_vectors(&mut StdRng::seed_from_u64(0), 4, 2);
        assert!(predict_in_batches(&perturber, &predict, features, 0).is_err());
        let wide = sample_feature_vectors(&mut StdRng::seed_from_u64(0), 4, 3);
        assert!(matches!(
            predict_in_batches(&perturber, &predict, wide, 2),
            Err(SlimeError::InvalidInput(_))
        ));
    }
}
