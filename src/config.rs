//! Configuration management for the tourist anomaly detector

use crate::models::{IsolationForestParams, LocalOutlierFactorParams, OneClassSvmParams};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    #[serde(default)]
    pub detectors: DetectorsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Model artifact location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Serialized pipeline written by `train` and loaded by the service
    pub artifact_path: String,
}

/// Training pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Labeled input dataset (CSV)
    pub dataset_path: String,
    /// Where the per-row predictions are written (CSV)
    pub predictions_path: String,
    /// Identifier and label columns expected alongside the record fields.
    /// They are carried into the predictions export but never reach the model.
    #[serde(default = "default_drop_columns")]
    pub drop_columns: Vec<String>,
}

fn default_drop_columns() -> Vec<String> {
    vec![
        "tourist_id".to_string(),
        "timestamp".to_string(),
        "is_anomaly".to_string(),
    ]
}

/// Per-detector hyper-parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorsConfig {
    pub isolation_forest: IsolationForestParams,
    pub one_class_svm: OneClassSvmParams,
    pub local_outlier_factor: LocalOutlierFactorParams,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file, falling back to defaults when it is absent
    pub fn load() -> Result<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Load from `path` if it exists, otherwise start from `AppConfig::default()`.
    /// Environment overrides apply in both cases.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_path(path)
        } else {
            tracing::warn!(
                path = %path.display(),
                "Configuration file not found, using defaults"
            );
            Self::build(None)
        }
    }

    /// Load configuration from a specific path, with `TOURIST__*` environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(Some(path.as_ref()))
    }

    /// Layer defaults, then the optional file, then the environment.
    fn build(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(env_source())
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("TOURIST")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            model: ModelConfig {
                artifact_path: "tourist_anomaly_detector_ensemble.json".to_string(),
            },
            training: TrainingConfig {
                dataset_path: "tourist_full_dataset.csv".to_string(),
                predictions_path: "tourist_predictions_ensemble.csv".to_string(),
                drop_columns: default_drop_columns(),
            },
            detectors: DetectorsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gamma, GammaMode};
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.training.drop_columns.len(), 3);
        assert_eq!(config.detectors.isolation_forest.n_estimators, 200);
        assert_eq!(config.detectors.isolation_forest.random_state, 42);
        assert_eq!(config.detectors.one_class_svm.nu, 0.1);
        assert_eq!(
            config.detectors.one_class_svm.gamma,
            Gamma::Mode(GammaMode::Scale)
        );
        assert_eq!(config.detectors.local_outlier_factor.n_neighbors, 20);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[model]
artifact_path = "models/ensemble.json"

[training]
dataset_path = "data/tourists.csv"
predictions_path = "data/predictions.csv"

[detectors.isolation_forest]
n_estimators = 50

[detectors.one_class_svm]
gamma = 0.05

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.training.drop_columns, default_drop_columns());
        assert_eq!(config.detectors.isolation_forest.n_estimators, 50);
        assert_eq!(config.detectors.isolation_forest.contamination, 0.1);
        assert_eq!(config.detectors.one_class_svm.gamma, Gamma::Value(0.05));
        assert_eq!(config.detectors.local_outlier_factor.n_neighbors, 20);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_env_overrides_detectors_without_file() {
        std::env::set_var("TOURIST__DETECTORS__ONE_CLASS_SVM__CACHE_SIZE_MB", "64");
        let config = AppConfig::load_or_default("does/not/exist.toml");
        std::env::remove_var("TOURIST__DETECTORS__ONE_CLASS_SVM__CACHE_SIZE_MB");

        let config = config.unwrap();
        assert_eq!(config.detectors.one_class_svm.cache_size_mb, 64);
        assert_eq!(
            config.detectors.one_class_svm.gamma,
            Gamma::Mode(GammaMode::Scale)
        );
        assert_eq!(config.detectors.isolation_forest.max_samples, None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[server]\nport = 9100\n").unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.bind_address(), "0.0.0.0:9100");
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.detectors.isolation_forest,
            IsolationForestParams::default()
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_or_default("does/not/exist.toml").unwrap();
        assert_eq!(config.model.artifact_path, "tourist_anomaly_detector_ensemble.json");
    }
}
