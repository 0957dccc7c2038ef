//! Training entry point
//!
//! Fits the ensemble on the labeled tourist dataset, exports per-row predictions,
//! saves the model artifact and sanity-checks it by reloading and scoring a sample.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tourist_anomaly_detector::{
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    dataset::{load_dataset, write_predictions},
    logging::init_tracing,
    metrics::{ConfusionMatrix, PredictionMetrics},
    models::{AnomalyPipeline, InferenceEngine, ModelArtifact, ModelLoader},
    types::{Label, TouristRecord},
};
use tracing::info;

/// Train the tourist anomaly ensemble
#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (built-in defaults when absent)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Labeled dataset CSV; overrides `training.dataset_path`
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Model artifact destination; overrides `model.artifact_path`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Predictions CSV destination; overrides `training.predictions_path`
    #[arg(short, long)]
    predictions: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load_or_default(&args.config)?;
    init_tracing(&config.logging)?;

    let dataset_path = args
        .dataset
        .unwrap_or_else(|| PathBuf::from(&config.training.dataset_path));
    let artifact_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.model.artifact_path));
    let predictions_path = args
        .predictions
        .unwrap_or_else(|| PathBuf::from(&config.training.predictions_path));

    info!("Starting ensemble training");

    let dataset = load_dataset(&dataset_path, &config.training.drop_columns)?;
    if dataset.is_empty() {
        bail!("Dataset {} has no rows", dataset_path.display());
    }

    let mut pipeline = AnomalyPipeline::from_config(&config.detectors);
    let started = Instant::now();
    pipeline.fit(&dataset.records)?;
    info!(
        rows = dataset.len(),
        features = pipeline.extractor().map(|e| e.feature_count()).unwrap_or(0),
        models = ?pipeline.ensemble().member_names(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Ensemble fitted"
    );

    let scoring_started = Instant::now();
    let votes = pipeline.predict_with_votes(&dataset.records)?;
    let per_record = scoring_started.elapsed() / dataset.len() as u32;

    let metrics = PredictionMetrics::new();
    for vote in &votes {
        metrics.record(
            vote.label,
            vote.votes.iter().map(|(name, label)| (name.as_str(), *label)),
            per_record,
        );
    }
    let labels: Vec<Label> = votes.iter().map(|v| v.label).collect();

    write_predictions(&predictions_path, &dataset, &labels)?;

    let artifact = ModelArtifact::new(pipeline, dataset.len());
    ModelLoader::save(&artifact, &artifact_path)?;

    metrics.print_summary();
    let confusion = ConfusionMatrix::from_pairs(dataset.labeled_pairs(&labels));
    if confusion != ConfusionMatrix::default() {
        confusion.print_summary();
    }

    // Round-trip check on the saved artifact
    let engine = InferenceEngine::from_path(&artifact_path)?;
    let sample = TouristRecord::distress_example();
    let result = engine.predict(&sample)?;
    info!(
        model_id = %engine.model_id(),
        prediction = %result.label,
        votes = ?result.model_votes,
        "Sample prediction"
    );

    info!(
        model = %artifact_path.display(),
        predictions = %predictions_path.display(),
        "Training complete"
    );
    Ok(())
}
