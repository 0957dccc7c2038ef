//! One-class SVM with an RBF kernel
//!
//! Solves the ν-parameterised one-class dual
//!
//! ```text
//! min ½ αᵀQα   s.t. 0 ≤ αᵢ ≤ 1,  Σαᵢ = ν·n
//! ```
//!
//! with sequential minimal optimisation over the maximal violating pair.
//! The decision value of `x` is `Σ αᵢ K(svᵢ, x) − ρ`.

use super::{check_features, OutlierDetector};
use crate::error::DetectorError;
use crate::types::prediction::Label;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

const NAME: &str = "one_class_svm";

/// Upper bound on each multiplier
const C: f64 = 1.0;

/// Floor for the curvature of a working pair
const TAU: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GammaMode {
    /// `1 / (n_features * Var(X))`
    Scale,
    /// `1 / n_features`
    Auto,
}

/// RBF kernel width, either derived from the data or given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Gamma {
    Mode(GammaMode),
    Value(f64),
}

impl Gamma {
    fn resolve(self, x: &Array2<f64>) -> f64 {
        let d = x.ncols().max(1) as f64;
        match self {
            Gamma::Value(g) => g,
            Gamma::Mode(GammaMode::Auto) => 1.0 / d,
            Gamma::Mode(GammaMode::Scale) => {
                let var = x.var(0.0);
                if var > 0.0 {
                    1.0 / (d * var)
                } else {
                    1.0
                }
            }
        }
    }
}

/// Hyper-parameters for [`OneClassSvm`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneClassSvmParams {
    pub gamma: Gamma,
    /// Upper bound on the training outlier share, lower bound on the support vector share
    pub nu: f64,
    /// Stopping tolerance on the KKT gap
    pub tol: f64,
    /// Hard cap on SMO iterations
    pub max_iter: usize,
    /// Kernel row cache budget in megabytes
    pub cache_size_mb: usize,
}

impl Default for OneClassSvmParams {
    fn default() -> Self {
        Self {
            gamma: Gamma::Mode(GammaMode::Scale),
            nu: 0.1,
            tol: 1e-3,
            max_iter: 10_000_000,
            cache_size_mb: 200,
        }
    }
}

fn rbf(gamma: f64, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * sq).exp()
}

/// Kernel rows computed on demand, with a bounded FIFO cache.
struct KernelCache<'a> {
    x: &'a Array2<f64>,
    gamma: f64,
    rows: HashMap<usize, Vec<f64>>,
    order: VecDeque<usize>,
    capacity: usize,
}

impl<'a> KernelCache<'a> {
    fn new(x: &'a Array2<f64>, gamma: f64, cache_size_mb: usize) -> Self {
        let row_bytes = x.nrows().max(1) * std::mem::size_of::<f64>();
        let capacity = (cache_size_mb * 1024 * 1024 / row_bytes).max(2);
        Self {
            x,
            gamma,
            rows: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn row(&mut self, i: usize) -> &[f64] {
        if !self.rows.contains_key(&i) {
            if self.rows.len() >= self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.rows.remove(&evicted);
                }
            }
            let xi = self.x.row(i);
            let row = self
                .x
                .rows()
                .into_iter()
                .map(|xj| rbf(self.gamma, xi, xj))
                .collect();
            self.rows.insert(i, row);
            self.order.push_back(i);
        }
        &self.rows[&i]
    }
}

/// One-class SVM outlier detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneClassSvm {
    params: OneClassSvmParams,
    /// Resolved kernel width
    gamma: f64,
    support_vectors: Array2<f64>,
    dual_coef: Vec<f64>,
    rho: f64,
    n_features: Option<usize>,
}

impl OneClassSvm {
    pub fn new(params: OneClassSvmParams) -> Self {
        Self {
            params,
            gamma: 0.0,
            support_vectors: Array2::zeros((0, 0)),
            dual_coef: Vec::new(),
            rho: 0.0,
            n_features: None,
        }
    }

    pub fn params(&self) -> &OneClassSvmParams {
        &self.params
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn support_vector_count(&self) -> usize {
        self.support_vectors.nrows()
    }

    /// Run SMO and return the multipliers and ρ.
    fn solve(&self, x: &Array2<f64>, gamma: f64) -> (Vec<f64>, f64) {
        let n = x.nrows();
        let mut cache = KernelCache::new(x, gamma, self.params.cache_size_mb);

        // Feasible start: the first ⌊νn⌋ multipliers at the bound, the next fractional.
        let nu_n = self.params.nu * n as f64;
        let full = (nu_n.floor() as usize).min(n);
        let mut alpha = vec![0.0; n];
        alpha[..full].fill(C);
        if full < n {
            alpha[full] = nu_n - full as f64;
        }

        // Gradient of the dual objective: G = Qα
        let mut grad = vec![0.0; n];
        for i in 0..n {
            if alpha[i] > 0.0 {
                let a = alpha[i];
                for (g, q) in grad.iter_mut().zip(cache.row(i)) {
                    *g += a * q;
                }
            }
        }

        let mut iterations = 0;
        while iterations < self.params.max_iter {
            let mut up = None;
            let mut g_max = f64::NEG_INFINITY;
            let mut low = None;
            let mut g_min = f64::INFINITY;
            for t in 0..n {
                if alpha[t] < C && -grad[t] > g_max {
                    g_max = -grad[t];
                    up = Some(t);
                }
                if alpha[t] > 0.0 && -grad[t] < g_min {
                    g_min = -grad[t];
                    low = Some(t);
                }
            }

            let (Some(i), Some(j)) = (up, low) else { break };
            if g_max - g_min < self.params.tol {
                break;
            }

            let q_i = cache.row(i).to_vec();
            let q_j = cache.row(j).to_vec();
            let quad = (q_i[i] + q_j[j] - 2.0 * q_i[j]).max(TAU);

            // Move mass from j to i, keeping Σα fixed
            let step = ((grad[j] - grad[i]) / quad)
                .min(C - alpha[i])
                .min(alpha[j]);

            if step >= C - alpha[i] {
                alpha[i] = C;
            } else {
                alpha[i] += step;
            }
            if step >= alpha[j] {
                alpha[j] = 0.0;
            } else {
                alpha[j] -= step;
            }

            for (k, g) in grad.iter_mut().enumerate() {
                *g += step * (q_i[k] - q_j[k]);
            }
            iterations += 1;
        }

        if iterations >= self.params.max_iter {
            warn!(
                max_iter = self.params.max_iter,
                "One-class SVM reached the iteration cap before converging"
            );
        }
        debug!(iterations, "One-class SVM solver finished");

        let rho = Self::compute_rho(&alpha, &grad);
        (alpha, rho)
    }

    fn compute_rho(alpha: &[f64], grad: &[f64]) -> f64 {
        let mut ub = f64::INFINITY;
        let mut lb = f64::NEG_INFINITY;
        let mut free_sum = 0.0;
        let mut free_count = 0usize;

        for (&a, &g) in alpha.iter().zip(grad) {
            if a >= C {
                lb = lb.max(g);
            } else if a <= 0.0 {
                ub = ub.min(g);
            } else {
                free_sum += g;
                free_count += 1;
            }
        }

        if free_count > 0 {
            free_sum / free_count as f64
        } else if ub.is_finite() && lb.is_finite() {
            (ub + lb) / 2.0
        } else if ub.is_finite() {
            ub
        } else {
            lb
        }
    }
}

impl OutlierDetector for OneClassSvm {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&mut self, x: &Array2<f64>) -> Result<(), DetectorError> {
        if !(self.params.nu > 0.0 && self.params.nu <= 1.0) {
            return Err(DetectorError::InvalidParameter {
                model: NAME.to_string(),
                reason: format!("nu must be in (0, 1], got {}", self.params.nu),
            });
        }
        if let Gamma::Value(g) = self.params.gamma {
            if !(g.is_finite() && g > 0.0) {
                return Err(DetectorError::InvalidParameter {
                    model: NAME.to_string(),
                    reason: format!("gamma must be a positive finite number, got {g}"),
                });
            }
        }
        if x.nrows() == 0 {
            return Err(DetectorError::EmptyTrainingSet {
                model: NAME.to_string(),
            });
        }

        let gamma = self.params.gamma.resolve(x);
        let (alpha, rho) = self.solve(x, gamma);

        let support: Vec<usize> = (0..alpha.len()).filter(|&i| alpha[i] > 0.0).collect();
        self.support_vectors = x.select(Axis(0), &support);
        self.dual_coef = support.iter().map(|&i| alpha[i]).collect();
        self.rho = rho;
        self.gamma = gamma;
        self.n_features = Some(x.ncols());

        debug!(
            gamma,
            rho,
            support_vectors = support.len(),
            "One-class SVM fitted"
        );
        Ok(())
    }

    /// Kernel expansion `Σ αᵢ K(svᵢ, x)` without the offset.
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>, DetectorError> {
        check_features(NAME, self.n_features, x)?;

        Ok(x
            .rows()
            .into_iter()
            .map(|sample| {
                self.support_vectors
                    .rows()
                    .into_iter()
                    .zip(&self.dual_coef)
                    .map(|(sv, &coef)| coef * rbf(self.gamma, sv, sample))
                    .sum::<f64>()
            })
            .collect())
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, DetectorError> {
        Ok(self.score_samples(x)? - self.rho)
    }

    /// Inliers need a strictly positive decision value.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>, DetectorError> {
        Ok(self
            .decision_function(x)?
            .iter()
            .map(|&d| if d > 0.0 { Label::Normal } else { Label::Anomaly })
            .collect())
    }
}
