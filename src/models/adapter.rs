//! Uniform prediction contract over model backends

use crate::error::PredictError;

/// A loaded model that maps a fixed-size input vector to a fixed-size output vector.
///
/// Implementations wrap one inference backend. The integrator only depends on
/// this trait, never on a concrete backend.
pub trait ModelAdapter: Send + Sync {
    /// Model name used in logs, errors and metrics
    fn name(&self) -> &str;

    /// Number of values every input must have
    fn input_dimensions(&self) -> usize;

    /// Number of values every prediction returns
    fn output_dimensions(&self) -> usize;

    /// Run the model on a single input vector.
    fn predict(&self, input: &[f64]) -> Result<Vec<f64>, PredictError>;

    /// Reject inputs whose length differs from the declared input dimension.
    fn check_input(&self, input: &[f64]) -> Result<(), PredictError> {
        if input.len() != self.input_dimensions() {
            return Err(PredictError::DimensionMismatch {
                expected: self.input_dimensions(),
                actual: input.len(),
            });
        }
        Ok(())
    }
}
