//! Error types for model prediction and batch integration

use thiserror::Error;

/// Failure of a single model prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    /// Input length does not match the model's declared input dimension
    #[error("invalid input shape: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Input could not be turned into the engine's tensor representation
    #[error("input conversion failed: {0}")]
    InputConversion(String),

    /// The inference engine rejected or failed the run
    #[error("inference failed: {0}")]
    Inference(String),

    /// The named output feature is absent from the engine's result
    #[error("output '{0}' missing from inference result")]
    MissingOutput(String),

    /// The model produced a different number of values than it declares
    #[error("invalid output shape: expected {expected} values, got {actual}")]
    OutputDimensionMismatch { expected: usize, actual: usize },

    /// A previous panic left the model session lock poisoned
    #[error("model session lock poisoned")]
    Poisoned,
}

/// Failure while integrating a batch.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// A model failed on one input of the batch
    #[error("model '{model}' failed on input {index}: {source}")]
    Model {
        index: usize,
        model: String,
        #[source]
        source: PredictError,
    },

    /// A concurrent integration worker panicked or was cancelled
    #[error("integration worker failed: {0}")]
    Worker(String),
}

impl IntegrationError {
    /// Index of the input that failed, if the failure belongs to one input.
    pub fn input_index(&self) -> Option<usize> {
        match self {
            IntegrationError::Model { index, .. } => Some(*index),
            IntegrationError::Worker(_) => None,
        }
    }
}
