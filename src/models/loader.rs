//! Model artifact persistence

use super::pipeline::AnomalyPipeline;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Artifact layout version understood by this build
pub const FORMAT_VERSION: u32 = 1;

/// A fitted pipeline plus the metadata needed to trace where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_id: Uuid,
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    /// Rows the pipeline was fitted on
    pub training_rows: usize,
    /// Encoded feature names, in column order
    pub feature_names: Vec<String>,
    pub pipeline: AnomalyPipeline,
}

impl ModelArtifact {
    /// Wrap a fitted pipeline.
    pub fn new(pipeline: AnomalyPipeline, training_rows: usize) -> Self {
        let feature_names = pipeline
            .extractor()
            .map(|e| e.feature_names())
            .unwrap_or_default();

        Self {
            model_id: Uuid::new_v4(),
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            training_rows,
            feature_names,
            pipeline,
        }
    }
}

/// Reads and writes model artifacts as JSON.
pub struct ModelLoader;

impl ModelLoader {
    /// Write an artifact to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(artifact: &ModelArtifact, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create model file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, artifact).context("Failed to serialize model")?;
        writer.flush()?;

        info!(
            model_id = %artifact.model_id,
            path = %path.display(),
            "Model artifact saved"
        );
        Ok(())
    }

    /// Load an artifact from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ModelArtifact> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model artifact");

        let file = File::open(path)
            .with_context(|| format!("Failed to open model file {}", path.display()))?;
        let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse model file {}", path.display()))?;

        if artifact.format_version != FORMAT_VERSION {
            bail!(
                "Unsupported model format version {} (expected {})",
                artifact.format_version,
                FORMAT_VERSION
            );
        }

        info!(
            model_id = %artifact.model_id,
            trained_at = %artifact.trained_at,
            training_rows = artifact.training_rows,
            features = artifact.feature_names.len(),
            "Model loaded successfully"
        );
        Ok(artifact)
    }
}
