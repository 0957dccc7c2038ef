//! Type definitions for the tourist anomaly detector

pub mod prediction;
pub mod record;

pub use prediction::{Label, PredictionResponse};
pub use record::TouristRecord;
