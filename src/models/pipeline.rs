//! Preprocessing + ensemble, fitted and applied as one unit

use super::ensemble::{AnomalyEnsemble, EnsembleVote};
use crate::config::DetectorsConfig;
use crate::error::DetectorError;
use crate::feature_extractor::FeatureExtractor;
use crate::types::prediction::Label;
use crate::types::record::TouristRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Feature extraction followed by the voting ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyPipeline {
    extractor: Option<FeatureExtractor>,
    ensemble: AnomalyEnsemble,
}

impl AnomalyPipeline {
    pub fn new(ensemble: AnomalyEnsemble) -> Self {
        Self {
            extractor: None,
            ensemble,
        }
    }

    /// Pipeline with the standard detector trio configured from `detectors`.
    pub fn from_config(detectors: &DetectorsConfig) -> Self {
        Self::new(AnomalyEnsemble::standard(
            detectors.isolation_forest.clone(),
            detectors.one_class_svm.clone(),
            detectors.local_outlier_factor.clone(),
        ))
    }

    pub fn extractor(&self) -> Option<&FeatureExtractor> {
        self.extractor.as_ref()
    }

    pub fn ensemble(&self) -> &AnomalyEnsemble {
        &self.ensemble
    }

    /// Learn the encoding and fit every detector on the encoded records.
    pub fn fit(&mut self, records: &[TouristRecord]) -> Result<(), DetectorError> {
        if records.is_empty() {
            return Err(DetectorError::EmptyTrainingSet {
                model: "pipeline".to_string(),
            });
        }

        let extractor = FeatureExtractor::fit(records);
        let matrix = extractor.transform(records);
        info!(
            rows = matrix.nrows(),
            features = matrix.ncols(),
            "Encoded training records"
        );

        self.ensemble.fit(&matrix)?;
        self.extractor = Some(extractor);
        Ok(())
    }

    fn fitted_extractor(&self) -> Result<&FeatureExtractor, DetectorError> {
        self.extractor.as_ref().ok_or_else(|| DetectorError::NotFitted {
            model: "pipeline".to_string(),
        })
    }

    /// Combined label for each record.
    pub fn predict(&self, records: &[TouristRecord]) -> Result<Vec<Label>, DetectorError> {
        let matrix = self.fitted_extractor()?.transform(records);
        self.ensemble.predict(&matrix)
    }

    /// Combined label and per-model votes for each record.
    pub fn predict_with_votes(
        &self,
        records: &[TouristRecord],
    ) -> Result<Vec<EnsembleVote>, DetectorError> {
        let matrix = self.fitted_extractor()?.transform(records);
        self.ensemble.predict_with_votes(&matrix)
    }

    /// Score a single record.
    pub fn predict_one(&self, record: &TouristRecord) -> Result<EnsembleVote, DetectorError> {
        self.predict_with_votes(std::slice::from_ref(record))?
            .pop()
            .ok_or_else(|| DetectorError::NotFitted {
                model: "pipeline".to_string(),
            })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::record::TouristRecord;
    use rand::prelude::*;

    /// Calm tourists jittered around `TouristRecord::default()`.
    pub fn calm_tourists(n: usize, seed: u64) -> Vec<TouristRecord> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let mut r = TouristRecord::default();
                r.latitude += rng.gen_range(-0.01..0.01);
                r.longitude += rng.gen_range(-0.01..0.01);
                r.gps_shift_m += rng.gen_range(-5.0..5.0);
                r.speed_kmph += rng.gen_range(-1.0..1.0);
                r.heart_rate_bpm += rng.gen_range(-8..=8);
                r.blood_pressure_sys += rng.gen_range(-6..=6);
                r.steps_last_hour += rng.gen_range(-300..=300);
                r.temperature_c += rng.gen_range(-2.0..2.0);
                r.light_level_lux += rng.gen_range(-400..=400);
                r.last_checkin_min += rng.gen_range(-10..=10);
                r.phone_battery_pct += rng.gen_range(-15..=15);
                r.spend_per_day_usd += rng.gen_range(-20.0..20.0);
                r
            })
            .collect()
    }

    /// Stranded tourist far outside the calm cluster.
    pub fn stranded_tourist() -> TouristRecord {
        let mut r = TouristRecord::distress_example();
        r.time_of_day = "afternoon".to_string();
        r.weather_condition = "clear".to_string();
        r.crowd_density = "medium".to_string();
        r.trip_purpose = "leisure".to_string();
        r.gps_shift_m = 4000.0;
        r.steps_last_hour = 20;
        r.light_level_lux = 5;
        r.last_checkin_min = 900;
        r
    }
}
