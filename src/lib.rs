//! Model Integrator Library
//!
//! Loads pre-trained ONNX models, runs every model on each input vector and
//! concatenates their outputs, in registration order, into one combined
//! vector per input.

pub mod config;
pub mod error;
pub mod integrator;
pub mod metrics;
pub mod models;

pub use config::AppConfig;
pub use error::{IntegrationError, PredictError};
pub use integrator::ModelIntegrator;
pub use metrics::IntegrationMetrics;
pub use models::{ModelAdapter, ModelLoader, OnnxModel};
