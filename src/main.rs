//! Tourist Anomaly Detector - Main Entry Point
//!
//! Loads the trained ensemble artifact and serves predictions over HTTP.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tourist_anomaly_detector::{
    config::AppConfig,
    logging::init_tracing,
    models::InferenceEngine,
    server::{app, AppState},
};
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    info!("Starting Tourist Anomaly Detector");

    let engine = InferenceEngine::from_path(&config.model.artifact_path).with_context(|| {
        format!(
            "No usable model at {} (run the `train` binary first)",
            config.model.artifact_path
        )
    })?;
    info!(
        model_id = %engine.model_id(),
        models = ?engine.model_names(),
        features = engine.feature_count(),
        "Inference engine initialized"
    );

    let state = AppState::new(engine);
    let metrics = state.metrics.clone();

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(address = %address, "Listening for prediction requests");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
