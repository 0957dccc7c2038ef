//! Outlier detectors, the voting ensemble and the persisted pipeline

pub mod ensemble;
pub mod inference;
pub mod isolation_forest;
pub mod loader;
pub mod local_outlier_factor;
pub mod one_class_svm;
pub mod pipeline;

pub use ensemble::{majority_vote, AnomalyEnsemble, DetectorSpec};
pub use inference::InferenceEngine;
pub use isolation_forest::{IsolationForest, IsolationForestParams};
pub use loader::{ModelArtifact, ModelLoader};
pub use local_outlier_factor::{LocalOutlierFactor, LocalOutlierFactorParams};
pub use one_class_svm::{Gamma, GammaMode, OneClassSvm, OneClassSvmParams};
pub use pipeline::AnomalyPipeline;

use crate::error::DetectorError;
use crate::types::prediction::Label;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Common interface of the unsupervised detectors.
///
/// `decision_function` is negative for outliers; `predict` turns it into labels.
pub trait OutlierDetector {
    fn name(&self) -> &str;

    fn fit(&mut self, x: &Array2<f64>) -> Result<(), DetectorError>;

    /// Raw normality score (higher = more normal).
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>, DetectorError>;

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, DetectorError>;

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>, DetectorError> {
        Ok(self
            .decision_function(x)?
            .iter()
            .map(|&d| if d < 0.0 { Label::Anomaly } else { Label::Normal })
            .collect())
    }
}

/// A fitted (or fittable) detector of any supported kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detector {
    IsolationForest(IsolationForest),
    OneClassSvm(OneClassSvm),
    LocalOutlierFactor(LocalOutlierFactor),
}

impl Detector {
    fn inner(&self) -> &dyn OutlierDetector {
        match self {
            Detector::IsolationForest(m) => m,
            Detector::OneClassSvm(m) => m,
            Detector::LocalOutlierFactor(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn OutlierDetector {
        match self {
            Detector::IsolationForest(m) => m,
            Detector::OneClassSvm(m) => m,
            Detector::LocalOutlierFactor(m) => m,
        }
    }
}

impl OutlierDetector for Detector {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn fit(&mut self, x: &Array2<f64>) -> Result<(), DetectorError> {
        self.inner_mut().fit(x)
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>, DetectorError> {
        self.inner().score_samples(x)
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, DetectorError> {
        self.inner().decision_function(x)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>, DetectorError> {
        self.inner().predict(x)
    }
}

/// Percentile with linear interpolation between closest ranks.
///
/// `q` is in [0, 100]. Returns `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Reject inputs whose width differs from the training width.
pub(crate) fn check_features(
    model: &str,
    expected: Option<usize>,
    x: &Array2<f64>,
) -> Result<(), DetectorError> {
    let expected = expected.ok_or_else(|| DetectorError::NotFitted {
        model: model.to_string(),
    })?;

    if x.ncols() != expected {
        return Err(DetectorError::DimensionMismatch {
            model: model.to_string(),
            expected,
            actual: x.ncols(),
        });
    }
    Ok(())
}

pub(crate) fn check_contamination(model: &str, contamination: f64) -> Result<(), DetectorError> {
    if !(contamination > 0.0 && contamination <= 0.5) {
        return Err(DetectorError::InvalidParameter {
            model: model.to_string(),
            reason: format!("contamination must be in (0, 0.5], got {contamination}"),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_data {
    use ndarray::Array2;
    use rand::prelude::*;

    /// Tight 2-D cluster around the origin followed by one far outlier (last row).
    pub fn cluster_with_outlier(n: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = Array2::zeros((n + 1, 2));
        for i in 0..n {
            data[[i, 0]] = rng.gen_range(-1.0..1.0);
            data[[i, 1]] = rng.gen_range(-1.0..1.0);
        }
        data[[n, 0]] = 8.0;
        data[[n, 1]] = -8.0;
        data
    }
}
