//! Local Outlier Factor in novelty mode
//!
//! Fit memorises the training set together with each point's k-distance and
//! local reachability density. New samples are scored against their k nearest
//! training neighbours.

use super::{check_contamination, check_features, percentile, OutlierDetector};
use crate::error::DetectorError;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

const NAME: &str = "local_outlier_factor";

/// Guards the density against duplicate points
const DENSITY_EPS: f64 = 1e-10;

/// Hyper-parameters for [`LocalOutlierFactor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalOutlierFactorParams {
    /// Neighbourhood size, clamped to `n - 1`
    pub n_neighbors: usize,
    pub contamination: f64,
}

impl Default for LocalOutlierFactorParams {
    fn default() -> Self {
        Self {
            n_neighbors: 20,
            contamination: 0.1,
        }
    }
}

/// Local Outlier Factor detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalOutlierFactor {
    params: LocalOutlierFactorParams,
    training: Array2<f64>,
    /// Distance to each training point's k-th neighbour
    k_distance: Vec<f64>,
    /// Local reachability density of each training point
    lrd: Vec<f64>,
    /// Effective neighbourhood size
    k: usize,
    offset: f64,
    n_features: Option<usize>,
}

fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

impl LocalOutlierFactor {
    pub fn new(params: LocalOutlierFactorParams) -> Self {
        Self {
            params,
            training: Array2::zeros((0, 0)),
            k_distance: Vec::new(),
            lrd: Vec::new(),
            k: 0,
            offset: 0.0,
            n_features: None,
        }
    }

    pub fn params(&self) -> &LocalOutlierFactorParams {
        &self.params
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn n_neighbors(&self) -> usize {
        self.k
    }

    /// The `k` nearest training points to `sample`, as (index, distance) sorted by distance.
    fn neighbors(&self, sample: ArrayView1<f64>, exclude: Option<usize>) -> Vec<(usize, f64)> {
        let mut distances: Vec<(usize, f64)> = self
            .training
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude)
            .map(|(i, row)| (i, euclidean(sample, row)))
            .collect();

        let k = self.k.min(distances.len());
        if k == 0 {
            return Vec::new();
        }
        distances.select_nth_unstable_by(k - 1, |a, b| a.1.total_cmp(&b.1));
        distances.truncate(k);
        distances.sort_by(|a, b| a.1.total_cmp(&b.1));
        distances
    }

    /// Local reachability density of a point given its neighbourhood.
    fn reachability_density(&self, neighbors: &[(usize, f64)]) -> f64 {
        let mean_reach = neighbors
            .iter()
            .map(|&(j, d)| self.k_distance[j].max(d))
            .sum::<f64>()
            / neighbors.len() as f64;
        1.0 / (mean_reach + DENSITY_EPS)
    }

    /// Negated outlier factor: `-mean(lrd(neighbours)) / lrd(point)`.
    fn negative_factor(&self, neighbors: &[(usize, f64)], lrd: f64) -> f64 {
        let ratio = neighbors.iter().map(|&(j, _)| self.lrd[j] / lrd).sum::<f64>()
            / neighbors.len() as f64;
        -ratio
    }
}

impl OutlierDetector for LocalOutlierFactor {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&mut self, x: &Array2<f64>) -> Result<(), DetectorError> {
        check_contamination(NAME, self.params.contamination)?;
        if self.params.n_neighbors == 0 {
            return Err(DetectorError::InvalidParameter {
                model: NAME.to_string(),
                reason: "n_neighbors must be at least 1".to_string(),
            });
        }

        let n = x.nrows();
        if n == 0 {
            return Err(DetectorError::EmptyTrainingSet {
                model: NAME.to_string(),
            });
        }
        if n < 2 {
            return Err(DetectorError::TooFewRows {
                model: NAME.to_string(),
                required: 2,
                actual: n,
            });
        }

        self.training = x.clone();
        self.k = self.params.n_neighbors.min(n - 1);
        self.n_features = Some(x.ncols());

        // Each training point's neighbourhood excludes itself
        let neighborhoods: Vec<Vec<(usize, f64)>> = (0..n)
            .map(|i| self.neighbors(x.row(i), Some(i)))
            .collect();

        self.k_distance = neighborhoods
            .iter()
            .map(|nbrs| nbrs.last().map(|&(_, d)| d).unwrap_or(0.0))
            .collect();
        self.lrd = neighborhoods
            .iter()
            .map(|nbrs| self.reachability_density(nbrs))
            .collect();

        let training_scores: Vec<f64> = neighborhoods
            .iter()
            .zip(&self.lrd)
            .map(|(nbrs, &lrd)| self.negative_factor(nbrs, lrd))
            .collect();
        self.offset = percentile(&training_scores, 100.0 * self.params.contamination)
            .unwrap_or(-1.5);

        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>, DetectorError> {
        check_features(NAME, self.n_features, x)?;

        Ok(x.rows()
            .into_iter()
            .map(|sample| {
                let nbrs = self.neighbors(sample, None);
                let lrd = self.reachability_density(&nbrs);
                self.negative_factor(&nbrs, lrd)
            })
            .collect())
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, DetectorError> {
        Ok(self.score_samples(x)? - self.offset)
    }
}
