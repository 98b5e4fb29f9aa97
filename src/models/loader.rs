//! ONNX model loader

use crate::config::ModelSpec;
use crate::models::adapter::ModelAdapter;
use crate::models::onnx::OnnxModel;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{info, warn};

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model described by `spec`
    pub fn load_model(&self, spec: &ModelSpec) -> Result<OnnxModel> {
        spec.validate()?;

        info!(
            model = %spec.name,
            path = %spec.path.display(),
            threads = self.onnx_threads,
            "Loading ONNX model"
        );

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(&spec.path)
            .with_context(|| format!("Failed to load model '{}' from {:?}", spec.name, spec.path))?;

        let input_name = match &spec.input_name {
            Some(name) => name.clone(),
            None => session
                .inputs
                .first()
                .map(|i| i.name.clone())
                .with_context(|| format!("Model '{}' declares no inputs", spec.name))?,
        };

        if !session.outputs.iter().any(|o| o.name == spec.output_name) {
            let available: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
            warn!(
                model = %spec.name,
                output = %spec.output_name,
                available = ?available,
                "Configured output not declared by model"
            );
        }

        let model = OnnxModel::new(
            spec.name.clone(),
            session,
            input_name,
            spec.output_name.clone(),
            spec.input_dimensions,
            spec.output_dimensions,
        );

        info!(
            model = %model.name(),
            input = %model.input_name(),
            output = %model.output_name(),
            input_dimensions = model.input_dimensions(),
            output_dimensions = model.output_dimensions(),
            "Model loaded successfully"
        );

        Ok(model)
    }

    /// Load every configured model, preserving configuration order.
    ///
    /// Fails on the first model that cannot be loaded, since skipping one
    /// would shift the layout of every combined output.
    pub fn load_all_models(&self, specs: &[ModelSpec]) -> Result<Vec<Box<dyn ModelAdapter>>> {
        if specs.is_empty() {
            warn!("No models configured, integration will produce empty outputs");
        }

        let mut models: Vec<Box<dyn ModelAdapter>> = Vec::with_capacity(specs.len());
        for spec in specs {
            let model = self.load_model(spec)?;
            models.push(Box::new(model));
        }

        info!(count = models.len(), "Loaded {} models", models.len());

        Ok(models)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec(path: &str) -> ModelSpec {
        ModelSpec {
            name: "missing".to_string(),
            path: PathBuf::from(path),
            input_dimensions: 2,
            output_dimensions: 2,
            input_name: None,
            output_name: "output".to_string(),
        }
    }

    #[test]
    fn test_invalid_spec_rejected_before_loading() {
        let loader = ModelLoader::default();
        let mut bad = spec("does-not-matter.onnx");
        bad.input_dimensions = 0;

        let err = loader.load_model(&bad).err().unwrap();
        assert!(err.to_string().contains("input_dimensions"));
    }

    #[test]
    fn test_empty_model_list() {
        let loader = ModelLoader::default();
        let models = loader.load_all_models(&[]).unwrap();
        assert!(models.is_empty());
    }
}
