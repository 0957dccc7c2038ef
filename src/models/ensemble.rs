//! Majority-vote ensemble over independently fitted outlier detectors

use super::{
    Detector, IsolationForest, IsolationForestParams, LocalOutlierFactor,
    LocalOutlierFactorParams, OneClassSvm, OneClassSvmParams, OutlierDetector,
};
use crate::error::DetectorError;
use crate::types::prediction::Label;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Combine signed votes: sum them and take the sign. A zero sum is an anomaly.
pub fn majority_vote(votes: &[Label]) -> Label {
    let sum: i32 = votes.iter().map(|v| v.vote()).sum();
    Label::from_vote(sum)
}

/// Fraction of voters that agree with the combined label.
pub fn agreement(votes: &[Label]) -> f64 {
    if votes.is_empty() {
        return 0.0;
    }
    let combined = majority_vote(votes);
    votes.iter().filter(|&&v| v == combined).count() as f64 / votes.len() as f64
}

/// Unfitted description of an ensemble member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorSpec {
    IsolationForest(IsolationForestParams),
    OneClassSvm(OneClassSvmParams),
    LocalOutlierFactor(LocalOutlierFactorParams),
}

impl DetectorSpec {
    /// Build a fresh, unfitted detector.
    pub fn build(&self) -> Detector {
        match self {
            DetectorSpec::IsolationForest(p) => {
                Detector::IsolationForest(IsolationForest::new(p.clone()))
            }
            DetectorSpec::OneClassSvm(p) => Detector::OneClassSvm(OneClassSvm::new(p.clone())),
            DetectorSpec::LocalOutlierFactor(p) => {
                Detector::LocalOutlierFactor(LocalOutlierFactor::new(p.clone()))
            }
        }
    }
}

/// Combined label for one row plus the individual model votes behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleVote {
    pub label: Label,
    pub votes: Vec<(String, Label)>,
}

/// Ensemble of named detectors combined by majority vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyEnsemble {
    members: Vec<(String, DetectorSpec)>,
    fitted: Vec<(String, Detector)>,
}

impl AnomalyEnsemble {
    pub fn new(members: Vec<(String, DetectorSpec)>) -> Self {
        Self {
            members,
            fitted: Vec::new(),
        }
    }

    /// The standard trio: isolation forest, one-class SVM and LOF.
    pub fn standard(
        iforest: IsolationForestParams,
        ocsvm: OneClassSvmParams,
        lof: LocalOutlierFactorParams,
    ) -> Self {
        Self::new(vec![
            ("iforest".to_string(), DetectorSpec::IsolationForest(iforest)),
            ("ocsvm".to_string(), DetectorSpec::OneClassSvm(ocsvm)),
            ("lof".to_string(), DetectorSpec::LocalOutlierFactor(lof)),
        ])
    }

    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn is_fitted(&self) -> bool {
        !self.fitted.is_empty()
    }

    /// Fit every member from scratch on the same matrix.
    ///
    /// Previously fitted models are discarded first, so refitting never mixes state.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<(), DetectorError> {
        self.fitted.clear();

        let mut fitted = Vec::with_capacity(self.members.len());
        for (name, spec) in &self.members {
            let mut detector = spec.build();
            info!(model = %name, rows = x.nrows(), features = x.ncols(), "Fitting detector");
            detector.fit(x)?;
            fitted.push((name.clone(), detector));
        }

        self.fitted = fitted;
        Ok(())
    }

    /// Per-model votes for each row, in member order.
    fn member_votes(&self, x: &Array2<f64>) -> Result<Vec<(String, Vec<Label>)>, DetectorError> {
        if !self.is_fitted() {
            return Err(DetectorError::NotFitted {
                model: "ensemble".to_string(),
            });
        }

        self.fitted
            .iter()
            .map(|(name, model)| Ok((name.clone(), model.predict(x)?)))
            .collect()
    }

    /// Combined label for each row.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>, DetectorError> {
        Ok(self
            .predict_with_votes(x)?
            .into_iter()
            .map(|v| v.label)
            .collect())
    }

    /// Combined label for each row, with the votes that produced it.
    pub fn predict_with_votes(&self, x: &Array2<f64>) -> Result<Vec<EnsembleVote>, DetectorError> {
        let per_model = self.member_votes(x)?;

        let rows = (0..x.nrows())
            .map(|row| {
                let votes: Vec<(String, Label)> = per_model
                    .iter()
                    .map(|(name, labels)| (name.clone(), labels[row]))
                    .collect();
                let label = majority_vote(&votes.iter().map(|(_, l)| *l).collect::<Vec<_>>());
                EnsembleVote { label, votes }
            })
            .collect::<Vec<_>>();

        debug!(rows = rows.len(), models = per_model.len(), "Ensemble prediction complete");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_data::cluster_with_outlier;
    use ndarray::array;

    fn quick_ensemble() -> AnomalyEnsemble {
        AnomalyEnsemble::standard(
            IsolationForestParams {
                n_estimators: 50,
                ..Default::default()
            },
            OneClassSvmParams::default(),
            LocalOutlierFactorParams::default(),
        )
    }

    #[test]
    fn test_majority_vote() {
        use Label::{Anomaly, Normal};

        assert_eq!(majority_vote(&[Normal, Normal, Anomaly]), Normal);
        assert_eq!(majority_vote(&[Anomaly, Anomaly, Normal]), Anomaly);
        assert_eq!(majority_vote(&[Normal, Normal, Normal]), Normal);
        assert_eq!(majority_vote(&[Anomaly, Anomaly, Anomaly]), Anomaly);
    }

    #[test]
    fn test_tie_resolves_to_anomaly() {
        use Label::{Anomaly, Normal};

        assert_eq!(majority_vote(&[Normal, Anomaly]), Anomaly);
        assert_eq!(majority_vote(&[Anomaly, Normal, Normal, Anomaly]), Anomaly);
        assert_eq!(majority_vote(&[]), Anomaly);
    }

    #[test]
    fn test_agreement() {
        use Label::{Anomaly, Normal};

        assert_eq!(agreement(&[Normal, Normal, Normal]), 1.0);
        assert!((agreement(&[Normal, Normal, Anomaly]) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(agreement(&[]), 0.0);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let ensemble = quick_ensemble();
        assert!(matches!(
            ensemble.predict(&array![[0.0, 0.0]]),
            Err(DetectorError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_ensemble_flags_far_point() {
        let data = cluster_with_outlier(200, 13);
        let mut ensemble = quick_ensemble();
        ensemble.fit(&data).unwrap();

        let results = ensemble
            .predict_with_votes(&array![[0.0, 0.0], [25.0, -25.0]])
            .unwrap();

        assert_eq!(results[0].label, Label::Normal);
        assert_eq!(results[1].label, Label::Anomaly);
        assert_eq!(results[1].votes.len(), 3);
        assert!(results[1].votes.iter().all(|(_, v)| v.is_anomaly()));
        assert_eq!(ensemble.member_names(), vec!["iforest", "ocsvm", "lof"]);
    }

    #[test]
    fn test_refit_discards_previous_models() {
        let mut ensemble = quick_ensemble();
        ensemble.fit(&cluster_with_outlier(50, 1)).unwrap();

        let wide = Array2::from_shape_fn((40, 3), |(i, j)| (i * (j + 1)) as f64 / 10.0);
        ensemble.fit(&wide).unwrap();

        assert!(ensemble.predict(&wide.slice(ndarray::s![0..2, ..]).to_owned()).is_ok());
        assert!(matches!(
            ensemble.predict(&array![[0.0, 0.0]]),
            Err(DetectorError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_failed_fit_leaves_ensemble_unfitted() {
        let mut ensemble = quick_ensemble();
        ensemble.fit(&cluster_with_outlier(50, 1)).unwrap();

        assert!(ensemble.fit(&Array2::zeros((0, 2))).is_err());
        assert!(!ensemble.is_fitted());
    }
}
