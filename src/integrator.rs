//! Multi-model integration: every model runs on every input and the
//! outputs are concatenated in registration order.

use crate::error::{IntegrationError, PredictError};
use crate::metrics::IntegrationMetrics;
use crate::models::adapter::ModelAdapter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Runs a fixed, ordered set of models over input batches.
pub struct ModelIntegrator {
    /// Models in concatenation order
    models: Vec<Box<dyn ModelAdapter>>,
    metrics: Option<Arc<IntegrationMetrics>>,
}

impl ModelIntegrator {
    /// Create an integrator; `models` order defines the output layout.
    pub fn new(models: Vec<Box<dyn ModelAdapter>>) -> Self {
        info!(
            models = models.len(),
            output_dimensions = models.iter().map(|m| m.output_dimensions()).sum::<usize>(),
            "Model integrator initialized"
        );
        Self {
            models,
            metrics: None,
        }
    }

    /// Record per-model and per-input timings into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<IntegrationMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Get the number of registered models
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Get model names in registration order
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    /// Length of every combined output vector
    pub fn output_dimensions(&self) -> usize {
        self.models.iter().map(|m| m.output_dimensions()).sum()
    }

    /// Integrate a batch, stopping at the first failing input.
    ///
    /// Returns one combined vector per input, in input order.
    pub fn integrate(&self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, IntegrationError> {
        let mut results = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            results.push(self.integrate_one(index, input)?);
        }

        debug!(inputs = inputs.len(), "Batch integration complete");
        Ok(results)
    }

    /// Integrate a batch, reporting each input's outcome separately.
    pub fn integrate_each(&self, inputs: &[Vec<f64>]) -> Vec<Result<Vec<f64>, IntegrationError>> {
        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| self.integrate_one(index, input))
            .collect()
    }

    /// Run every model on one input and concatenate the outputs.
    ///
    /// `index` is only used to identify the input in errors.
    pub fn integrate_one(&self, index: usize, input: &[f64]) -> Result<Vec<f64>, IntegrationError> {
        let start_time = Instant::now();
        let mut combined = Vec::with_capacity(self.output_dimensions());

        for model in &self.models {
            let model_start = Instant::now();
            let result = run_model(&**model, input);

            if let Some(metrics) = &self.metrics {
                metrics.record_model_time(model.name(), model_start.elapsed());
            }

            match result {
                Ok(output) => combined.extend(output),
                Err(source) => {
                    error!(
                        input = index,
                        model = %model.name(),
                        error = %source,
                        "Model prediction failed"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_failure(model.name());
                    }
                    return Err(IntegrationError::Model {
                        index,
                        model: model.name().to_string(),
                        source,
                    });
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_input(start_time.elapsed());
        }

        Ok(combined)
    }

    /// Integrate a batch on blocking worker tasks, at most `workers` inputs at a time.
    ///
    /// Results keep input order and registration order. After the first
    /// failure no further input is started; tasks already running are
    /// awaited and the failure with the lowest input index is returned.
    pub async fn integrate_concurrent(
        self: Arc<Self>,
        inputs: Vec<Vec<f64>>,
        workers: usize,
    ) -> Result<Vec<Vec<f64>>, IntegrationError> {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let failed = Arc::new(AtomicBool::new(false));
        let mut first_error = None;
        let mut handles = Vec::with_capacity(inputs.len());

        for (index, input) in inputs.into_iter().enumerate() {
            if failed.load(Ordering::Acquire) {
                break;
            }
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    first_error = Some(IntegrationError::Worker(e.to_string()));
                    break;
                }
            };
            if failed.load(Ordering::Acquire) {
                break;
            }

            let integrator = self.clone();
            let failed = failed.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                // Held until the failure flag is published
                let _permit = permit;
                if failed.load(Ordering::Acquire) {
                    return None;
                }
                let result = integrator.integrate_one(index, &input);
                if result.is_err() {
                    failed.store(true, Ordering::Release);
                }
                Some(result)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Some(Ok(combined))) => results.push(combined),
                Ok(Some(Err(e))) => {
                    first_error.get_or_insert(e);
                }
                // Skipped after another input failed
                Ok(None) => {}
                Err(e) => {
                    first_error.get_or_insert(IntegrationError::Worker(e.to_string()));
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        debug!(inputs = results.len(), workers = workers, "Concurrent integration complete");
        Ok(results)
    }
}

/// Validate shapes around a single prediction.
fn run_model(model: &dyn ModelAdapter, input: &[f64]) -> Result<Vec<f64>, PredictError> {
    model.check_input(input)?;
    let output = model.predict(input)?;
    if output.len() != model.output_dimensions() {
        return Err(PredictError::OutputDimensionMismatch {
            expected: model.output_dimensions(),
            actual: output.len(),
        });
    }
    Ok(output)
}
