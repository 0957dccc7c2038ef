//! CSV ingestion of the labeled training dataset and export of predictions

use crate::types::prediction::Label;
use crate::types::record::{TouristRecord, CATEGORICAL_FIELDS, NUMERIC_FIELDS};
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use std::path::Path;
use tracing::{info, warn};

/// Column holding the ground-truth label, if the dataset has one
pub const LABEL_COLUMN: &str = "is_anomaly";

/// Column appended to the predictions export
pub const PREDICTION_COLUMN: &str = "prediction";

/// A loaded dataset: the parsed records plus the raw rows for re-export.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub headers: StringRecord,
    pub raw_rows: Vec<StringRecord>,
    pub records: Vec<TouristRecord>,
    /// Ground truth per row, when the label column is present and parseable
    pub labels: Vec<Option<Label>>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// (predicted, actual) pairs for rows that carry a label.
    pub fn labeled_pairs<'a>(
        &'a self,
        predicted: &'a [Label],
    ) -> impl Iterator<Item = (Label, Label)> + 'a {
        predicted
            .iter()
            .zip(&self.labels)
            .filter_map(|(&p, actual)| actual.map(|a| (p, a)))
    }
}

/// Interpret the label column: 1/true is an anomaly, 0/false is normal.
fn parse_label(value: &str) -> Option<Label> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(Label::Anomaly),
        "0" | "0.0" | "false" => Some(Label::Normal),
        _ => None,
    }
}

/// Load a dataset CSV.
///
/// `drop_columns` names the identifier and label columns that sit next to the
/// record fields. They are kept for export but never reach the model, and a
/// record field cannot be listed among them. Any other column that is not a
/// record field is ignored with a warning.
pub fn load_dataset<P: AsRef<Path>>(path: P, drop_columns: &[String]) -> Result<Dataset> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open dataset {}", path.display()))?;

    let headers = reader.headers()?.clone();

    if let Some(field) = drop_columns
        .iter()
        .find(|c| record_columns().contains(&c.as_str()))
    {
        bail!("Column {} is a model feature and cannot be dropped", field);
    }

    for column in drop_columns {
        if !headers.iter().any(|h| h == column) {
            warn!(column = %column, "Drop column not present in dataset");
        }
    }
    for header in headers.iter() {
        let known = NUMERIC_FIELDS.contains(&header)
            || CATEGORICAL_FIELDS.contains(&header)
            || drop_columns.iter().any(|c| c == header);
        if !known {
            warn!(column = %header, "Unrecognised dataset column ignored");
        }
    }

    let label_index = headers.iter().position(|h| h == LABEL_COLUMN);

    let mut raw_rows = Vec::new();
    let mut records = Vec::new();
    let mut labels = Vec::new();

    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to read dataset row {}", line + 1))?;
        let record: TouristRecord = row
            .deserialize(Some(&headers))
            .with_context(|| format!("Invalid record on dataset row {}", line + 1))?;

        labels.push(label_index.and_then(|i| row.get(i)).and_then(parse_label));
        records.push(record);
        raw_rows.push(row);
    }

    info!(
        path = %path.display(),
        rows = records.len(),
        labeled = labels.iter().filter(|l| l.is_some()).count(),
        "Dataset loaded"
    );

    Ok(Dataset {
        headers,
        raw_rows,
        records,
        labels,
    })
}

/// Write every input column plus a `prediction` column (+1 normal, -1 anomaly).
pub fn write_predictions<P: AsRef<Path>>(
    path: P,
    dataset: &Dataset,
    predictions: &[Label],
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = Writer::from_path(path)
        .with_context(|| format!("Failed to create predictions file {}", path.display()))?;

    let mut headers = dataset.headers.clone();
    headers.push_field(PREDICTION_COLUMN);
    writer.write_record(&headers)?;

    for (row, label) in dataset.raw_rows.iter().zip(predictions) {
        let mut out = row.clone();
        out.push_field(&label.vote().to_string());
        writer.write_record(&out)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = predictions.len(), "Predictions written");
    Ok(())
}

/// Column order of a full dataset row.
pub fn dataset_headers() -> Vec<&'static str> {
    let mut headers = vec!["tourist_id", "timestamp"];
    headers.extend(record_columns());
    headers.push(LABEL_COLUMN);
    headers
}

/// Render a record as CSV fields in `record_columns()` order.
pub fn record_fields(record: &TouristRecord) -> Result<Vec<String>> {
    let value = serde_json::to_value(record).context("Failed to serialize record")?;
    Ok(record_columns()
        .into_iter()
        .map(|column| match &value[column] {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect())
}

/// Record fields in declaration order.
pub fn record_columns() -> Vec<&'static str> {
    vec![
        "latitude",
        "longitude",
        "altitude_m",
        "time_stationary_hr",
        "gps_shift_m",
        "speed_kmph",
        "avg_speed_last_30min",
        "distance_from_city_center_km",
        "geo_fence_violation",
        "altitude_change_m",
        "time_of_day",
        "places_visited",
        "heart_rate_bpm",
        "blood_pressure_sys",
        "blood_pressure_dia",
        "oxygen_saturation_pct",
        "skin_temperature_c",
        "steps_last_hour",
        "stress_index",
        "hydration_level_pct",
        "weather_condition",
        "temperature_c",
        "humidity_pct",
        "air_quality_index",
        "crowd_density",
        "light_level_lux",
        "calamity_nearby",
        "area_risk_score",
        "sos_pressed",
        "last_checkin_min",
        "phone_battery_pct",
        "network_strength_dbm",
        "app_open_count_last_hr",
        "companion_count",
        "travel_mode",
        "booking_channel",
        "trip_duration_days",
        "spend_per_day_usd",
        "trip_purpose",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn drop_columns() -> Vec<String> {
        crate::config::AppConfig::default().training.drop_columns
    }

    fn write_csv(rows: &[(&str, TouristRecord, &str)]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(dataset_headers()).unwrap();
        for (id, record, label) in rows {
            let mut fields = vec![id.to_string(), "2024-05-01T10:00:00Z".to_string()];
            fields.extend(record_fields(record).unwrap());
            fields.push(label.to_string());
            writer.write_record(&fields).unwrap();
        }
        file.write_all(&writer.into_inner().unwrap()).unwrap();
        file
    }

    #[test]
    fn test_load_dataset() {
        let file = write_csv(&[
            ("T1", TouristRecord::default(), "0"),
            ("T2", TouristRecord::distress_example(), "1"),
            ("T3", TouristRecord::default(), ""),
        ]);

        let dataset = load_dataset(file.path(), &drop_columns()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.records[1], TouristRecord::distress_example());
        assert_eq!(
            dataset.labels,
            vec![Some(Label::Normal), Some(Label::Anomaly), None]
        );
        assert_eq!(dataset.headers.len(), 42);
    }

    #[test]
    fn test_write_predictions_appends_column() {
        let file = write_csv(&[
            ("T1", TouristRecord::default(), "0"),
            ("T2", TouristRecord::distress_example(), "1"),
        ]);
        let dataset = load_dataset(file.path(), &drop_columns()).unwrap();

        let out = tempfile::NamedTempFile::new().unwrap();
        write_predictions(out.path(), &dataset, &[Label::Normal, Label::Anomaly]).unwrap();

        let mut reader = csv::Reader::from_path(out.path()).unwrap();
        assert_eq!(reader.headers().unwrap().iter().last(), Some("prediction"));
        let rows: Vec<StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].get(0), Some("T1"));
        assert_eq!(rows[0].iter().last(), Some("1"));
        assert_eq!(rows[1].iter().last(), Some("-1"));
    }

    #[test]
    fn test_invalid_row_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tourist_id,latitude").unwrap();
        writeln!(file, "T1,27.1").unwrap();

        let err = load_dataset(file.path(), &drop_columns()).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_feature_column_cannot_be_dropped() {
        let file = write_csv(&[("T1", TouristRecord::default(), "0")]);
        let mut columns = drop_columns();
        columns.push("heart_rate_bpm".to_string());

        let err = load_dataset(file.path(), &columns).unwrap_err();
        assert!(err.to_string().contains("heart_rate_bpm"));
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("1"), Some(Label::Anomaly));
        assert_eq!(parse_label(" True "), Some(Label::Anomaly));
        assert_eq!(parse_label("0"), Some(Label::Normal));
        assert_eq!(parse_label("maybe"), None);
    }

    #[test]
    fn test_record_columns_cover_schema() {
        let columns = record_columns();
        assert_eq!(columns.len(), 39);
        assert!(NUMERIC_FIELDS.iter().all(|f| columns.contains(f)));
        assert!(CATEGORICAL_FIELDS.iter().all(|f| columns.contains(f)));
    }
}
