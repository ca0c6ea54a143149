// src/core/errors.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlimeError {
    /// A caller-supplied argument violates a precondition (wrong feature-vector
    /// length, zero samples, empty label set, invalid configuration).
    #[error("Invalid Input: {0}")]
    InvalidInput(String),
    #[error("Incompatible Dimensions: {0}")]
    IncompatibleDimensions(String),
    /// `explain` was asked for a label that was never fit.
    #[error("Label {0} not in explanation")]
    LabelNotExplained(usize),
    #[error("Model Prediction Error: {0}")]
    ModelPredictionError(String),
    /// The local regression system could not be solved.
    #[error("Solver Error: {0}")]
    Solver(String),
    #[error("Ndarray Error: {0}")]
    NdarrayError(#[from] ndarray::ShapeError),
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, SlimeError>;
