//! Configuration management for the model integrator

use crate::models::onnx::DEFAULT_OUTPUT_NAME;
use anyhow::{bail, Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configuration file path
pub const CONFIG_PATH_ENV: &str = "MODEL_INTEGRATOR_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub models: ModelsConfig,
    #[serde(default)]
    pub integration: IntegrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// ML models configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Number of threads for ONNX inference per model (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
    /// Models in concatenation order
    #[serde(default)]
    pub specs: Vec<ModelSpec>,
}

/// A single model artifact and its declared shape
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelSpec {
    /// Model name used in logs and errors
    pub name: String,
    /// Path to the ONNX file
    pub path: PathBuf,
    pub input_dimensions: usize,
    pub output_dimensions: usize,
    /// Input to bind; the model's first input when unset
    #[serde(default)]
    pub input_name: Option<String>,
    /// Output feature to read from each result
    #[serde(default = "default_output_name")]
    pub output_name: String,
}

/// Batch integration configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationConfig {
    /// Concurrent workers; 1 integrates sequentially
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Input batch run by the binary
    #[serde(default = "default_inputs")]
    pub inputs: Vec<Vec<f64>>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_onnx_threads() -> usize {
    1
}

fn default_output_name() -> String {
    DEFAULT_OUTPUT_NAME.to_string()
}

fn default_workers() -> usize {
    1
}

fn default_inputs() -> Vec<Vec<f64>> {
    vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl ModelSpec {
    /// Check the declared shape before any loading happens
    pub fn validate(&self) -> Result<()> {
        if self.input_dimensions == 0 {
            bail!("Model '{}' has input_dimensions = 0", self.name);
        }
        if self.output_dimensions == 0 {
            bail!("Model '{}' has output_dimensions = 0", self.name);
        }
        Ok(())
    }
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            inputs: default_inputs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `MODEL_INTEGRATOR_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .with_context(|| format!("Failed to build configuration from {:?}", path.as_ref()))?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    /// Reject configurations that cannot produce a usable integrator
    pub fn validate(&self) -> Result<()> {
        for spec in &self.models.specs {
            spec.validate()?;
        }
        if self.integration.workers == 0 {
            bail!("integration.workers must be at least 1");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let spec = |name: &str| ModelSpec {
            name: name.to_string(),
            path: PathBuf::from(format!("{}.onnx", name)),
            input_dimensions: 2,
            output_dimensions: 2,
            input_name: None,
            output_name: default_output_name(),
        };

        Self {
            models: ModelsConfig {
                onnx_threads: 1,
                specs: vec![spec("model1"), spec("model2")],
            },
            integration: IntegrationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.models.specs.len(), 2);
        assert_eq!(config.models.specs[0].name, "model1");
        assert_eq!(config.models.specs[1].path, PathBuf::from("model2.onnx"));
        assert_eq!(config.models.specs[0].output_name, "output");
        assert_eq!(config.integration.workers, 1);
        assert_eq!(config.integration.inputs.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[models]
onnx_threads = 2

[[models.specs]]
name = "a"
path = "models/a.onnx"
input_dimensions = 3
output_dimensions = 1

[[models.specs]]
name = "b"
path = "models/b.onnx"
input_dimensions = 3
output_dimensions = 4
output_name = "probabilities"

[integration]
workers = 4
inputs = [[1.0, 2.0, 3.0]]

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.models.onnx_threads, 2);
        assert_eq!(config.models.specs.len(), 2);
        assert_eq!(config.models.specs[0].output_name, "output");
        assert_eq!(config.models.specs[1].output_name, "probabilities");
        assert_eq!(config.models.specs[1].output_dimensions, 4);
        assert_eq!(config.integration.workers, 4);
        assert_eq!(config.integration.inputs, vec![vec![1.0, 2.0, 3.0]]);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut config = AppConfig::default();
        config.models.specs[1].output_dimensions = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("model2"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = AppConfig::default();
        config.integration.workers = 0;
        assert!(config.validate().is_err());
    }
}
