//! Tourist Anomaly Detector Library
//!
//! Flags anomalous tourist telemetry with a majority-vote ensemble of three
//! unsupervised outlier detectors (Isolation Forest, One-Class SVM, Local
//! Outlier Factor) behind a one-hot feature encoder.

pub mod config;
pub mod dataset;
pub mod error;
pub mod feature_extractor;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, DetectorError};
pub use feature_extractor::FeatureExtractor;
pub use models::inference::InferenceEngine;
pub use models::pipeline::AnomalyPipeline;
pub use types::{Label, PredictionResponse, TouristRecord};
