//! Inference engine serving predictions from a loaded model artifact

use super::ensemble::agreement;
use super::loader::{ModelArtifact, ModelLoader};
use crate::error::DetectorError;
use crate::types::prediction::Label;
use crate::types::record::TouristRecord;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Result of scoring one record
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Combined ensemble decision
    pub label: Label,
    /// Individual model votes
    pub model_votes: HashMap<String, Label>,
    /// Share of models agreeing with `label`
    pub agreement: f64,
}

/// Read-only wrapper around the fitted pipeline.
pub struct InferenceEngine {
    artifact: ModelArtifact,
}

impl InferenceEngine {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }

    /// Load the artifact at `path` and build an engine around it
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(ModelLoader::load(path)?))
    }

    pub fn model_id(&self) -> Uuid {
        self.artifact.model_id
    }

    pub fn model_names(&self) -> Vec<String> {
        self.artifact.pipeline.ensemble().member_names()
    }

    pub fn feature_count(&self) -> usize {
        self.artifact.feature_names.len()
    }

    /// Score a single record.
    pub fn predict(&self, record: &TouristRecord) -> Result<PredictionResult, DetectorError> {
        let vote = self.artifact.pipeline.predict_one(record)?;
        let labels: Vec<Label> = vote.votes.iter().map(|(_, l)| *l).collect();

        debug!(
            label = %vote.label,
            votes = ?vote.votes,
            "Record scored"
        );

        Ok(PredictionResult {
            label: vote.label,
            agreement: agreement(&labels),
            model_votes: vote.votes.into_iter().collect(),
        })
    }

    /// Score a batch of records.
    pub fn predict_batch(&self, records: &[TouristRecord]) -> Result<Vec<Label>, DetectorError> {
        self.artifact.pipeline.predict(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorsConfig;
    use crate::models::pipeline::test_support::{calm_tourists, stranded_tourist};
    use crate::models::AnomalyPipeline;

    fn engine() -> InferenceEngine {
        let mut detectors = DetectorsConfig::default();
        detectors.isolation_forest.n_estimators = 40;
        let records = calm_tourists(150, 17);

        let mut pipeline = AnomalyPipeline::from_config(&detectors);
        pipeline.fit(&records).unwrap();
        InferenceEngine::new(ModelArtifact::new(pipeline, records.len()))
    }

    #[test]
    fn test_prediction_result() {
        let engine = engine();
        let result = engine.predict(&stranded_tourist()).unwrap();

        assert_eq!(result.label, Label::Anomaly);
        assert_eq!(result.model_votes.len(), 3);
        assert!(result.agreement >= 2.0 / 3.0);
        assert_eq!(engine.model_names(), vec!["iforest", "ocsvm", "lof"]);
        assert_eq!(engine.feature_count(), 39);
    }

    #[test]
    fn test_batch_matches_single() {
        let engine = engine();
        let records = vec![TouristRecord::default(), stranded_tourist()];

        let batch = engine.predict_batch(&records).unwrap();
        for (record, label) in records.iter().zip(batch) {
            assert_eq!(engine.predict(record).unwrap().label, label);
        }
    }
}
