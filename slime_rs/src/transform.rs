// src/transform.rs

//! Concrete transformations over `ndarray` instances and the perturber that
//! composes them.

use crate::core::{Result, SlimeError};
use crate::traits::{BinaryPerturber, Transformer};
use ndarray::{Array, Dimension, Zip};
use std::collections::BTreeSet;
use std::fmt;

fn check_shape(instance: &[usize], expected: &[usize], what: &str) -> Result<()> {
    if instance != expected {
        return Err(SlimeError::IncompatibleDimensions(format!(
            "Instance has shape {:?}, but the {} has shape {:?}.",
            instance, what, expected
        )));
    }
    Ok(())
}

fn distinct_segments<D: Dimension>(segments: &Array<usize, D>) -> Vec<usize> {
    segments.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Masks out part of an instance by elementwise multiplication.
#[derive(Debug, Clone)]
pub struct SegmentTransformer<D: Dimension> {
    mask: Array<f64, D>,
}

impl<D: Dimension> SegmentTransformer<D> {
    pub fn new(mask: Array<f64, D>) -> Self {
        SegmentTransformer { mask }
    }

    /// Zeroes every element labelled `segment` in a segmentation map and keeps the rest.
    pub fn from_segments(segments: &Array<usize, D>, segment: usize) -> Self {
        SegmentTransformer {
            mask: segments.mapv(|s| if s == segment { 0.0 } else { 1.0 }),
        }
    }

    pub fn mask(&self) -> &Array<f64, D> {
        &self.mask
    }
}

impl<D: Dimension> Transformer<Array<f64, D>> for SegmentTransformer<D> {
    fn transform(&self, mut instance: Array<f64, D>) -> Result<Array<f64, D>> {
        check_shape(instance.shape(), self.mask.shape(), "mask")?;
        Zip::from(&mut instance)
            .and(&self.mask)
            .for_each(|x, &m| *x *= m);
        Ok(instance)
    }
}

/// Replaces a region of an instance with a constant, e.g. greying out a superpixel.
#[derive(Debug, Clone)]
pub struct FillTransformer<D: Dimension> {
    region: Array<bool, D>,
    fill: f64,
}

impl<D: Dimension> FillTransformer<D> {
    pub fn new(region: Array<bool, D>, fill: f64) -> Self {
        FillTransformer { region, fill }
    }

    pub fn from_segments(segments: &Array<usize, D>, segment: usize, fill: f64) -> Self {
        FillTransformer {
            region: segments.mapv(|s| s == segment),
            fill,
        }
    }

    pub fn fill(&self) -> f64 {
        self.fill
    }
}

impl<D: Dimension> Transformer<Array<f64, D>> for FillTransformer<D> {
    fn transform(&self, mut instance: Array<f64, D>) -> Result<Array<f64, D>> {
        check_shape(instance.shape(), self.region.shape(), "region")?;
        let fill = self.fill;
        Zip::from(&mut instance)
            .and(&self.region)
            .for_each(|x, &inside| {
                if inside {
                    *x = fill;
                }
            });
        Ok(instance)
    }
}

/// Perturbs a stored instance by applying, in construction order, the
/// transformation of every disabled feature.
pub struct TransformerPerturber<I> {
    instance: I,
    transformers: Vec<Box<dyn Transformer<I>>>,
}

impl<I: Clone> TransformerPerturber<I> {
    pub fn new(instance: I, transformers: Vec<Box<dyn Transformer<I>>>) -> Self {
        TransformerPerturber {
            instance,
            transformers,
        }
    }

    pub fn instance(&self) -> &I {
        &self.instance
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }
}

impl<D: Dimension + 'static> TransformerPerturber<Array<f64, D>> {
    /// One zero-out feature per distinct segment id, in ascending id order.
    pub fn from_segmentation(instance: Array<f64, D>, segments: &Array<usize, D>) -> Result<Self> {
        check_shape(instance.shape(), segments.shape(), "segmentation")?;
        let transformers = distinct_segments(segments)
            .into_iter()
            .map(|s| Box::new(SegmentTransformer::from_segments(segments, s)) as Box<dyn Transformer<Array<f64, D>>>)
            .collect();
        Ok(TransformerPerturber::new(instance, transformers))
    }

    /// Like [`from_segmentation`](Self::from_segmentation), but suppressed
    /// segments are set to `fill` instead of zero.
    pub fn from_segmentation_with_fill(
        instance: Array<f64, D>,
        segments: &Array<usize, D>,
        fill: f64,
    ) -> Result<Self> {
        check_shape(instance.shape(), segments.shape(), "segmentation")?;
        let transformers = distinct_segments(segments)
            .into_iter()
            .map(|s| Box::new(FillTransformer::from_segments(segments, s, fill)) as Box<dyn Transformer<Array<f64, D>>>)
            .collect();
        Ok(TransformerPerturber::new(instance, transformers))
    }
}

impl<I: Clone> BinaryPerturber for TransformerPerturber<I> {
    type Instance = I;

    fn feature_count(&self) -> usize {
        self.transformers.len()
    }

    fn perturb(&self, enabled_features: &[bool]) -> Result<I> {
        if enabled_features.len() != self.transformers.len() {
            return Err(SlimeError::InvalidInput(format!(
                "Expected {} enabled flags, got {}.",
                self.transformers.len(),
                enabled_features.len()
            )));
        }
        let mut perturbed = self.instance.clone();
        for (&enabled, transformer) in enabled_features.iter().zip(&self.transformers) {
            if !enabled {
                perturbed = transformer.transform(perturbed)?;
            }
        }
        Ok(perturbed)
    }
}

impl<I> fmt::Debug for TransformerPerturber<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.transformers.iter().map(|t| t.name()).collect();
        f.debug_struct("TransformerPerturber")
            .field("feature_count", &self.transformers.len())
            .field("transformers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2, Ix2};

    fn region_mask(row: usize, col: usize) -> Array2<f64> {
        let mut mask = Array2::ones((2, 2));
        mask[[row, col]] = 0.0;
        mask
    }

    fn quadrant_perturber() -> TransformerPerturber<Array2<f64>> {
        let instance = array![[1.0, 2.0], [3.0, 4.0]];
        let transformers: Vec<Box<dyn Transformer<Array2<f64>>>> = vec![
            Box::new(SegmentTransformer::new(region_mask(0, 0))),
            Box::new(SegmentTransformer::new(region_mask(0, 1))),
            Box::new(SegmentTransformer::new(region_mask(1, 0))),
            Box::new(SegmentTransformer::new(region_mask(1, 1))),
        ];
        TransformerPerturber::new(instance, transformers)
    }

    /// Adds one to every element; used to check composition order.
    struct AddOne;

    impl Transformer<Array2<f64>> for AddOne {
        fn transform(&self, instance: Array2<f64>) -> Result<Array2<f64>> {
            Ok(instance + 1.0)
        }
    }

    struct Double;

    impl Transformer<Array2<f64>> for Double {
        fn transform(&self, instance: Array2<f64>) -> Result<Array2<f64>> {
            Ok(instance * 2.0)
        }
    }

    #[test]
    fn segment_transformer_masks_region() -> Result<()> {
        let t = SegmentTransformer::new(region_mask(1, 0));
        let out = t.transform(array![[1.0, 2.0], [3.0, 4.0]])?;
        assert_eq!(out, array![[1.0, 2.0], [0.0, 4.0]]);
        Ok(())
    }

    #[test]
    fn segment_transformer_rejects_wrong_shape() {
        let t = SegmentTransformer::new(region_mask(0, 0));
        let err = t.transform(Array2::ones((3, 2))).unwrap_err();
        assert!(matches!(err, SlimeError::IncompatibleDimensions(_)));
    }

    #[test]
    fn fill_transformer_fills_region() -> Result<()> {
        let segments = array![[0usize, 1], [1, 2]];
        let t = FillTransformer::from_segments(&segments, 1, 0.5);
        let out = t.transform(array![[1.0, 2.0], [3.0, 4.0]])?;
        assert_eq!(out, array![[1.0, 0.5], [0.5, 4.0]]);
        Ok(())
    }

    #[test]
    fn transformer_names_come_from_type() {
        let t = SegmentTransformer::<Ix2>::new(region_mask(0, 0));
        assert_eq!(t.name(), "SegmentTransformer");
        assert_eq!(AddOne.name(), "AddOne");
        let perturber = quadrant_perturber();
        assert_eq!(perturber.feature_names(), vec!["SegmentTransformer"; 4]);
    }

    #[test]
    fn perturb_applies_disabled_transformations() -> Result<()> {
        let perturber = quadrant_perturber();
        assert_eq!(perturber.feature_count(), 4);
        let out = perturber.perturb(&[true, false, true, false])?;
        assert_eq!(out, array![[1.0, 0.0], [3.0, 0.0]]);
        Ok(())
    }

    #[test]
    fn all_enabled_returns_original_and_base_suppresses_everything() -> Result<()> {
        let perturber = quadrant_perturber();
        assert_eq!(perturber.perturb(&[true; 4])?, *perturber.instance());
        assert_eq!(perturber.base()?, Array2::<f64>::zeros((2, 2)));
        assert_eq!(perturber.base()?, perturber.perturb(&[false; 4])?);
        Ok(())
    }

    #[test]
    fn perturb_does_not_mutate_stored_instance() -> Result<()> {
        let perturber = quadrant_perturber();
        let first = perturber.perturb(&[false, true, false, true])?;
        let second = perturber.perturb(&[false, true, false, true])?;
        assert_eq!(first, second);
        assert_eq!(*perturber.instance(), array![[1.0, 2.0], [3.0, 4.0]]);
        Ok(())
    }

    #[test]
    fn perturb_rejects_wrong_length() {
        let perturber = quadrant_perturber();
        let err = perturber.perturb(&[true, false]).unwrap_err();
        assert!(matches!(err, SlimeError::InvalidInput(_)));
        assert!(perturber.perturb(&[true; 5]).is_err());
    }

    #[test]
    fn transformations_compose_in_construction_order() -> Result<()> {
        let forward: Vec<Box<dyn Transformer<Array2<f64>>>> = vec![Box::new(AddOne), Box::new(Double)];
        let reversed: Vec<Box<dyn Transformer<Array2<f64>>>> = vec![Box::new(Double), Box::new(AddOne)];
        let add_then_double = TransformerPerturber::new(Array2::<f64>::zeros((1, 1)), forward);
        let double_then_add = TransformerPerturber::new(Array2::<f64>::zeros((1, 1)), reversed);
        assert_eq!(add_then_double.base()?, array![[2.0]]);
        assert_eq!(double_then_add.base()?, array![[1.0]]);
        Ok(())
    }

    #[test]
    fn zero_feature_perturber_always_returns_instance() -> Result<()> {
        let perturber = TransformerPerturber::<Array2<f64>>::new(array![[5.0]], Vec::new());
        assert_eq!(perturber.feature_count(), 0);
        assert_eq!(perturber.base()?, array![[5.0]]);
        assert_eq!(perturber.perturb(&[])?, array![[5.0]]);
        Ok(())
    }

    #[test]
    fn from_segmentation_builds_one_feature_per_segment() -> Result<()> {
        let segments = array![[3usize, 3], [7, 9]];
        let perturber =
            TransformerPerturber::from_segmentation(array![[1.0, 2.0], [3.0, 4.0]], &segments)?;
        assert_eq!(perturber.feature_count(), 3);
        // features follow ascending segment id: 3, 7, 9
        assert_eq!(perturber.perturb(&[false, true, true])?, array![[0.0, 0.0], [3.0, 4.0]]);

        let filled = TransformerPerturber::from_segmentation_with_fill(
            array![[1.0, 2.0], [3.0, 4.0]],
            &segments,
            -1.0,
        )?;
        assert_eq!(filled.perturb(&[true, true, false])?, array![[1.0, 2.0], [3.0, -1.0]]);
        Ok(())
    }

    #[test]
    fn from_segmentation_rejects_mismatched_map() {
        let segments = array![[0usize, 1, 2]];
        let err = TransformerPerturber::from_segmentation(Array2::zeros((2, 2)), &segments).unwrap_err();
        assert!(matches!(err, SlimeError::IncompatibleDimensions(_)));
    }
}
