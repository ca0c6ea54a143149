// src/lib.rs

//! `slime_rs` explains the predictions of black-box models by switching
//! structured features of an instance (image regions, tokens, ...) on and off,
//! querying the model on the perturbed instances, and fitting a weighted local
//! linear surrogate for each label of interest.
//!
//! ```ignore
//! use slime_rs::{Euclidean, ExplainOptions, Explainer, ExplainerConfig, TransformerPerturber};
//!
//! // one feature per superpixel of the image
//! let perturber = TransformerPerturber::from_segmentation(image, &segments)?;
//! let config = ExplainerConfig { random_state: Some(42), ..Default::default() };
//! let mut explainer = Explainer::new(Euclidean, Some(config))?;
//!
//! let options = ExplainOptions::default().with_num_samples(1000).with_top_labels(1);
//! let explanation = explainer.explain_instance(perturber, &predict, &options)?;
//!
//! // the image with only its five most supportive superpixels left visible
//! let label = explanation.top_labels()[0];
//! let visible = explanation.explain(label, 5)?;
//! ```

pub mod algorithms;
pub mod core;
pub mod traits;
pub mod transform;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::{
    Cosine, Euclidean, ExplainOptions, Explainer, ExplainerConfig, ExponentialKernel, FeatureSelection,
    LabelSelection, RidgeRegressor,
};
pub use crate::core::{
    Explanation, FeatureFilter, FeatureMatrix, LabelFit, Predictions, Result, SampleSet, SlimeError, WeightSign,
};
pub use crate::traits::{BinaryPerturber, DistanceMetric, LocalRegressor, Predictor, Transformer};
pub use crate::transform::{FillTransformer, SegmentTransformer, TransformerPerturber};
