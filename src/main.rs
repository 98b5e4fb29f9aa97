//! Model Integrator - Main Entry Point
//!
//! Loads the configured ONNX models, integrates the configured input batch
//! and prints the combined outputs to stdout as JSON.

use anyhow::{Context, Result};
use model_integrator::{
    config::{AppConfig, LoggingConfig},
    integrator::ModelIntegrator,
    metrics::IntegrationMetrics,
    models::loader::ModelLoader,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_logging(&config.logging)?;
    info!("Configuration loaded successfully");

    let metrics = Arc::new(IntegrationMetrics::new());

    // Load models in concatenation order
    let loader = ModelLoader::with_threads(config.models.onnx_threads)?;
    let models = loader.load_all_models(&config.models.specs)?;

    let integrator = Arc::new(ModelIntegrator::new(models).with_metrics(metrics.clone()));
    info!(
        "Integrator ready with {} models: {:?} ({} output values per input)",
        integrator.model_count(),
        integrator.model_names(),
        integrator.output_dimensions()
    );

    let inputs = config.integration.inputs.clone();
    let workers = config.integration.workers;
    info!(inputs = inputs.len(), workers = workers, "Integrating batch");

    let results = if workers > 1 {
        integrator.integrate_concurrent(inputs, workers).await?
    } else {
        integrator.integrate(&inputs)?
    };

    println!(
        "{}",
        serde_json::to_string(&results).context("Failed to serialize results")?
    );

    metrics.print_summary();

    Ok(())
}

/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("model_integrator={}", logging.level))
            .context("Invalid logging level")?,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }

    Ok(())
}
