//! ONNX Runtime backed model adapter

use crate::error::PredictError;
use crate::models::adapter::ModelAdapter;
use ort::session::{Session, SessionOutputs};
use ort::value::Tensor;
use std::sync::Mutex;
use tracing::debug;

/// Output feature name expected from model artifacts unless configured otherwise
pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// A loaded ONNX model exposed through [`ModelAdapter`].
pub struct OnnxModel {
    /// Model name
    name: String,
    /// ONNX Runtime session (running needs exclusive access)
    session: Mutex<Session>,
    /// Input name bound to the input tensor
    input_name: String,
    /// Output feature read from the inference result
    output_name: String,
    input_dimensions: usize,
    output_dimensions: usize,
}

impl OnnxModel {
    pub(crate) fn new(
        name: String,
        session: Session,
        input_name: String,
        output_name: String,
        input_dimensions: usize,
        output_dimensions: usize,
    ) -> Self {
        Self {
            name,
            session: Mutex::new(session),
            input_name,
            output_name,
            input_dimensions,
            output_dimensions,
        }
    }

    /// Input name the tensor is bound to
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Output feature read from each inference result
    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

impl ModelAdapter for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_dimensions(&self) -> usize {
        self.input_dimensions
    }

    fn output_dimensions(&self) -> usize {
        self.output_dimensions
    }

    fn predict(&self, input: &[f64]) -> Result<Vec<f64>, PredictError> {
        // Input tensor shape [1, input_dimensions]
        let shape = vec![1_i64, self.input_dimensions as i64];
        let data = prepare_input(input, self.input_dimensions)?;
        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| PredictError::InputConversion(e.to_string()))?;

        let mut session = self.session.lock().map_err(|_| PredictError::Poisoned)?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(|e| PredictError::Inference(e.to_string()))?;

        let values = extract_output(&outputs, &self.output_name, self.output_dimensions)?;

        debug!(
            model = %self.name,
            output = %self.output_name,
            values = values.len(),
            "Inference complete"
        );

        Ok(values)
    }
}

/// Check the input length and narrow it to tensor data.
fn prepare_input(input: &[f64], input_dimensions: usize) -> Result<Vec<f32>, PredictError> {
    if input.len() != input_dimensions {
        return Err(PredictError::DimensionMismatch {
            expected: input_dimensions,
            actual: input.len(),
        });
    }
    to_f32(input)
}

/// Narrow input values to the `f32` tensors the models are exported with.
fn to_f32(input: &[f64]) -> Result<Vec<f32>, PredictError> {
    input
        .iter()
        .enumerate()
        .map(|(position, &value)| {
            let narrowed = value as f32;
            if narrowed.is_finite() {
                Ok(narrowed)
            } else {
                Err(PredictError::InputConversion(format!(
                    "value {} at position {} is not a finite f32",
                    value, position
                )))
            }
        })
        .collect()
}

/// Read the named output feature as a flat vector.
fn extract_output(
    outputs: &SessionOutputs,
    output_name: &str,
    output_dimensions: usize,
) -> Result<Vec<f64>, PredictError> {
    read_output(
        output_name,
        outputs.get(output_name),
        |value| {
            value
                .try_extract_tensor::<f32>()
                .map(|(_, data)| data)
                .map_err(|e| e.to_string())
        },
        output_dimensions,
    )
}

/// Resolve a looked-up output value into `output_dimensions` widened values.
///
/// `extract` reads the value as `f32` data or describes why it cannot.
fn read_output<'v, V>(
    output_name: &str,
    value: Option<&'v V>,
    extract: impl FnOnce(&'v V) -> Result<&'v [f32], String>,
    output_dimensions: usize,
) -> Result<Vec<f64>, PredictError> {
    let value = value.ok_or_else(|| PredictError::MissingOutput(output_name.to_string()))?;

    let data = extract(value).map_err(|e| {
        PredictError::Inference(format!("output '{}' is not an f32 tensor: {}", output_name, e))
    })?;

    if data.len() != output_dimensions {
        return Err(PredictError::OutputDimensionMismatch {
            expected: output_dimensions,
            actual: data.len(),
        });
    }

    Ok(data.iter().map(|&v| v as f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_f32_accepts_finite_values() {
        let narrowed = to_f32(&[1.0, -2.5, 0.0]).unwrap();
        assert_eq!(narrowed, vec![1.0_f32, -2.5, 0.0]);
    }

    #[test]
    fn test_to_f32_rejects_non_finite_values() {
        assert!(matches!(
            to_f32(&[1.0, f64::NAN]),
            Err(PredictError::InputConversion(_))
        ));
        assert!(matches!(
            to_f32(&[f64::INFINITY]),
            Err(PredictError::InputConversion(_))
        ));
        // Finite in f64 but overflows f32
        assert!(matches!(
            to_f32(&[1e300]),
            Err(PredictError::InputConversion(_))
        ));
    }

    #[test]
    fn test_prepare_input_rejects_wrong_length() {
        assert_eq!(
            prepare_input(&[1.0, 2.0, 3.0], 2),
            Err(PredictError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        );
        assert_eq!(prepare_input(&[1.0, 2.0], 2), Ok(vec![1.0_f32, 2.0]));
    }

    fn as_f32(value: &Vec<f32>) -> Result<&[f32], String> {
        Ok(value.as_slice())
    }

    #[test]
    fn test_read_output_missing_name() {
        let missing: Option<&Vec<f32>> = None;
        let err = read_output("output", missing, as_f32, 2).unwrap_err();
        assert_eq!(err, PredictError::MissingOutput("output".to_string()));
    }

    #[test]
    fn test_read_output_wrong_type() {
        let value = vec![0.0_f32];
        let err = read_output("output", Some(&value), |_| Err("found i64 tensor".to_string()), 1)
            .unwrap_err();
        match err {
            PredictError::Inference(message) => {
                assert!(message.contains("output"));
                assert!(message.contains("found i64 tensor"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_output_checks_declared_length() {
        let value = vec![0.25_f32, 0.5, 0.75];
        let err = read_output("output", Some(&value), as_f32, 2).unwrap_err();
        assert_eq!(
            err,
            PredictError::OutputDimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_read_output_widens_values() {
        let value = vec![0.25_f32, -1.5];
        let values = read_output("output", Some(&value), as_f32, 2).unwrap();
        assert_eq!(values, vec![0.25, -1.5]);
    }

    #[test]
    fn test_default_output_name() {
        assert_eq!(DEFAULT_OUTPUT_NAME, "output");
    }
}
