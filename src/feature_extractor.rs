//! Feature extraction for the outlier detectors.
//!
//! Categorical fields are one-hot encoded against the categories seen during
//! training; numeric fields pass through unchanged. The layout is fixed at fit
//! time so training and inference produce identical column orders.

use crate::types::record::{TouristRecord, CATEGORICAL_FIELDS, NUMERIC_FIELDS};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Fitted one-hot + passthrough encoder.
///
/// Output columns: one block per categorical field (categories sorted), then the
/// numeric fields in record order. Categories never seen in training encode as an
/// all-zero block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureExtractor {
    /// Sorted known categories, one list per entry of `CATEGORICAL_FIELDS`
    categories: Vec<Vec<String>>,
}

impl FeatureExtractor {
    /// Learn the category vocabulary from training records.
    pub fn fit(records: &[TouristRecord]) -> Self {
        let categories = (0..CATEGORICAL_FIELDS.len())
            .map(|field| {
                let mut values: Vec<String> = records
                    .iter()
                    .map(|r| r.categorical_values()[field].to_string())
                    .collect();
                values.sort();
                values.dedup();
                values
            })
            .collect();

        Self { categories }
    }

    /// Number of output features.
    pub fn feature_count(&self) -> usize {
        self.categories.iter().map(Vec::len).sum::<usize>() + NUMERIC_FIELDS.len()
    }

    /// Output column names, e.g. `weather_condition_storm`, `heart_rate_bpm`.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.feature_count());
        for (field, values) in CATEGORICAL_FIELDS.iter().zip(&self.categories) {
            names.extend(values.iter().map(|v| format!("{field}_{v}")));
        }
        names.extend(NUMERIC_FIELDS.iter().map(|f| f.to_string()));
        names
    }

    /// Known categories for each categorical field.
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Encode one record.
    pub fn extract(&self, record: &TouristRecord) -> Vec<f64> {
        let mut features = Vec::with_capacity(self.feature_count());

        for (value, known) in record.categorical_values().iter().zip(&self.categories) {
            let hit = known.binary_search_by(|k| k.as_str().cmp(value)).ok();
            features.extend((0..known.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
        }

        features.extend_from_slice(&record.numeric_values());
        features
    }

    /// Encode a batch into an `n x d` matrix.
    pub fn transform(&self, records: &[TouristRecord]) -> Array2<f64> {
        let d = self.feature_count();
        let mut matrix = Array2::zeros((records.len(), d));
        for (mut row, record) in matrix.rows_mut().into_iter().zip(records) {
            for (slot, value) in row.iter_mut().zip(self.extract(record)) {
                *slot = value;
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<TouristRecord> {
        let mut night = TouristRecord::distress_example();
        night.weather_condition = "rain".to_string();
        vec![
            TouristRecord::default(),
            night,
            TouristRecord::distress_example(),
        ]
    }

    #[test]
    fn test_categories_sorted_and_deduplicated() {
        let extractor = FeatureExtractor::fit(&records());

        assert_eq!(extractor.categories()[0], vec!["afternoon", "night"]);
        assert_eq!(extractor.categories()[1], vec!["clear", "rain", "storm"]);
        // travel_mode is "walk" everywhere
        assert_eq!(extractor.categories()[3], vec!["walk"]);
    }

    #[test]
    fn test_feature_layout() {
        let extractor = FeatureExtractor::fit(&records());
        let features = extractor.extract(&TouristRecord::distress_example());

        // time_of_day(2) + weather(3) + crowd(2) + travel(1) + booking(1) + purpose(2) + 33
        assert_eq!(extractor.feature_count(), 44);
        assert_eq!(features.len(), 44);
        assert_eq!(&features[0..2], &[0.0, 1.0]); // night
        assert_eq!(&features[2..5], &[0.0, 0.0, 1.0]); // storm
        assert_eq!(features[11], 27.1); // latitude is the first numeric column

        let names = extractor.feature_names();
        assert_eq!(names[1], "time_of_day_night");
        assert_eq!(names[11], "latitude");
        assert_eq!(names.last().map(String::as_str), Some("spend_per_day_usd"));
    }

    #[test]
    fn test_unknown_category_is_all_zero() {
        let extractor = FeatureExtractor::fit(&records());
        let mut record = TouristRecord::default();
        record.weather_condition = "blizzard".to_string();

        let features = extractor.extract(&record);
        assert_eq!(&features[2..5], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_transform_matches_extract() {
        let data = records();
        let extractor = FeatureExtractor::fit(&data);
        let matrix = extractor.transform(&data);

        assert_eq!(matrix.dim(), (3, 44));
        assert_eq!(matrix.row(1).to_vec(), extractor.extract(&data[1]));
    }
}
