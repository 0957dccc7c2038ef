//! Isolation Forest
//!
//! Anomalies are isolated by fewer random splits, so their average path
//! length across the forest is short. Scores follow the usual convention:
//! `score_samples = -2^(-E[h(x)] / c(psi))`, higher means more normal.

use super::{check_contamination, check_features, percentile, OutlierDetector};
use crate::error::DetectorError;
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand::seq::index;
use serde::{Deserialize, Serialize};

const NAME: &str = "isolation_forest";

/// Euler-Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Hyper-parameters for [`IsolationForest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Rows drawn per tree; absent means `min(256, n)`
    pub max_samples: Option<usize>,
    /// Expected share of outliers in the training data
    pub contamination: f64,
    /// Seed for subsampling and split selection
    pub random_state: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_samples: None,
            contamination: 0.1,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum IsolationNode {
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build(data: &Array2<f64>, rows: &[usize], max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: Self::build_node(data, rows, 0, max_depth, rng),
        }
    }

    fn build_node(
        data: &Array2<f64>,
        rows: &[usize],
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> IsolationNode {
        if depth >= max_depth || rows.len() <= 1 {
            return IsolationNode::Leaf { size: rows.len() };
        }

        // Features that still vary inside this node
        let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
            .filter_map(|feature| {
                let (min, max) = rows.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &r| {
                        let v = data[[r, feature]];
                        (lo.min(v), hi.max(v))
                    },
                );
                (max > min).then_some((feature, min, max))
            })
            .collect();

        let Some(&(feature, min, max)) = candidates.choose(rng) else {
            return IsolationNode::Leaf { size: rows.len() };
        };

        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&r| data[[r, feature]] <= threshold);

        IsolationNode::Internal {
            feature,
            threshold,
            left: Box::new(Self::build_node(data, &left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(data, &right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationNode::Leaf { size } => return depth as f64 + average_path_length(*size),
                IsolationNode::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                    depth += 1;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Isolation Forest outlier detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    params: IsolationForestParams,
    trees: Vec<IsolationTree>,
    /// Subsample size actually used during fit
    samples_per_tree: usize,
    /// Score threshold derived from `contamination`
    offset: f64,
    n_features: Option<usize>,
}

impl IsolationForest {
    pub fn new(params: IsolationForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            samples_per_tree: 0,
            offset: 0.0,
            n_features: None,
        }
    }

    pub fn params(&self) -> &IsolationForestParams {
        &self.params
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl OutlierDetector for IsolationForest {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&mut self, x: &Array2<f64>) -> Result<(), DetectorError> {
        check_contamination(NAME, self.params.contamination)?;
        if self.params.n_estimators == 0 {
            return Err(DetectorError::InvalidParameter {
                model: NAME.to_string(),
                reason: "n_estimators must be at least 1".to_string(),
            });
        }

        let n = x.nrows();
        if n == 0 {
            return Err(DetectorError::EmptyTrainingSet {
                model: NAME.to_string(),
            });
        }

        let psi = self.params.max_samples.unwrap_or(256).clamp(1, n);
        let max_depth = (psi as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(self.params.random_state);

        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let rows = index::sample(&mut rng, n, psi).into_vec();
                IsolationTree::build(x, &rows, max_depth, &mut rng)
            })
            .collect();
        self.samples_per_tree = psi;
        self.n_features = Some(x.ncols());

        let scores = self.score_samples(x)?.to_vec();
        self.offset = percentile(&scores, 100.0 * self.params.contamination).unwrap_or(-0.5);

        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>, DetectorError> {
        check_features(NAME, self.n_features, x)?;

        let norm = average_path_length(self.samples_per_tree);
        let scores = x
            .rows()
            .into_iter()
            .map(|sample| {
                let mean_depth = self
                    .trees
                    .iter()
                    .map(|tree| tree.path_length(sample))
                    .sum::<f64>()
                    / self.trees.len() as f64;

                if norm > 0.0 {
                    -(2.0_f64.powf(-mean_depth / norm))
                } else {
                    -0.5
                }
            })
            .collect();

        Ok(scores)
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, DetectorError> {
        Ok(self.score_samples(x)? - self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_data::cluster_with_outlier;
    use crate::types::prediction::Label;

    fn small_forest() -> IsolationForest {
        IsolationForest::new(IsolationForestParams {
            n_estimators: 100,
            ..Default::default()
        })
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > average_path_length(16));
    }

    #[test]
    fn test_outlier_scores_lowest() {
        let data = cluster_with_outlier(200, 7);
        let mut forest = small_forest();
        forest.fit(&data).unwrap();

        let scores = forest.score_samples(&data).unwrap();
        let outlier = scores[200];
        assert!(scores.iter().take(200).all(|&s| s > outlier));

        let labels = forest.predict(&data).unwrap();
        assert_eq!(labels[200], Label::Anomaly);
    }

    #[test]
    fn test_contamination_sets_anomaly_share() {
        let data = cluster_with_outlier(199, 3);
        let mut forest = small_forest();
        forest.fit(&data).unwrap();

        let anomalies = forest
            .predict(&data)
            .unwrap()
            .into_iter()
            .filter(|l| l.is_anomaly())
            .count();
        // 10% of 200 rows, give or take interpolation at the threshold
        assert!((15..=25).contains(&anomalies), "got {anomalies}");
    }

    #[test]
    fn test_seeded_fit_is_deterministic() {
        let data = cluster_with_outlier(100, 11);
        let mut a = small_forest();
        let mut b = small_forest();
        a.fit(&data).unwrap();
        b.fit(&data).unwrap();

        assert_eq!(a.score_samples(&data).unwrap(), b.score_samples(&data).unwrap());
        assert_eq!(a.offset(), b.offset());
    }

    #[test]
    fn test_unfitted_and_mismatched_inputs() {
        let forest = small_forest();
        let data = cluster_with_outlier(10, 1);
        assert!(matches!(
            forest.predict(&data),
            Err(DetectorError::NotFitted { .. })
        ));

        let mut forest = small_forest();
        forest.fit(&data).unwrap();
        let wide = Array2::zeros((1, 3));
        assert!(matches!(
            forest.predict(&wide),
            Err(DetectorError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let mut forest = small_forest();
        assert!(matches!(
            forest.fit(&Array2::zeros((0, 2))),
            Err(DetectorError::EmptyTrainingSet { .. })
        ));
    }
}
