pub mod distance;
pub mod kernel;
pub mod lime;
pub mod ridge;
pub mod sampling;

pub use distance::{Cosine, Euclidean};
pub use kernel::ExponentialKernel;
pub use lime::{select_labels, ExplainOptions, Explainer, ExplainerConfig, LabelSelection};
pub use ridge::{FeatureSelection, RidgeRegressor};
pub use sampling::{predict_in_batches, sample_feature_vectors, DEFAULT_BATCH_SIZE};
