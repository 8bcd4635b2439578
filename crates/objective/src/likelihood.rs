//! Observation log-likelihoods for spike-count reconstruction.
//!
//! Tensors are batch-major: `(batch, time, channels)`. The result is
//! averaged over the batch and summed over time and channels.

use burn::prelude::*;
use burn::tensor::TensorData;
use statrs::function::gamma::ln_gamma;

use crate::error::ObjectiveError;

/// Pluggable reconstruction log-likelihood.
pub trait LogLikelihood<B: Backend> {
    /// Log-likelihood of `observed` under the model output `predicted`.
    ///
    /// Both tensors are batch-major with identical shape. Returns a scalar
    /// tensor of shape `(1,)`.
    fn log_likelihood(&self, observed: Tensor<B, 3>, predicted: Tensor<B, 3>) -> Tensor<B, 1>;
}

/// Configuration for the Poisson observation model.
#[derive(Config, Debug)]
pub struct PoissonLikelihoodConfig {
    /// Time-bin width. Predicted rates are multiplied by `dt` before evaluation.
    #[config(default = 1.0)]
    pub dt: f64,
}

impl PoissonLikelihoodConfig {
    pub fn init(&self) -> Result<PoissonLogLikelihood, ObjectiveError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ObjectiveError::InvalidTimeBin(self.dt));
        }
        Ok(PoissonLogLikelihood { dt: self.dt })
    }
}

/// Poisson log-likelihood of spike counts given a firing rate per bin width.
#[derive(Debug, Clone, Copy)]
pub struct PoissonLogLikelihood {
    dt: f64,
}

impl PoissonLogLikelihood {
    pub fn dt(&self) -> f64 {
        self.dt
    }
}

impl<B: Backend> LogLikelihood<B> for PoissonLogLikelihood {
    fn log_likelihood(&self, observed: Tensor<B, 3>, predicted: Tensor<B, 3>) -> Tensor<B, 1> {
        loglikelihood_poisson(observed, predicted.mul_scalar(self.dt))
    }
}

/// Log-likelihood of Poisson counts `k` given intensity `lam`.
///
/// Per element: `k * ln(lam) - lam - ln_gamma(k + 1)`, averaged over the
/// batch dimension and summed over the rest.
///
/// # Arguments
/// - `k`: observed counts, shape `(batch, time, channels)`
/// - `lam`: strictly positive intensities, same shape
///
/// # Returns
/// Scalar tensor of shape `(1,)`. `lam <= 0` produces -inf/NaN; callers are
/// responsible for positivity.
pub fn loglikelihood_poisson<B: Backend>(k: Tensor<B, 3>, lam: Tensor<B, 3>) -> Tensor<B, 1> {
    let log_k_factorial = log_factorial(&k);
    (k * lam.clone().log() - lam - log_k_factorial)
        .mean_dim(0)
        .sum()
}

/// `ln_gamma(k + 1)` elementwise. Counts are data, so this is a constant
/// of the graph and is computed on the host.
fn log_factorial<B: Backend>(k: &Tensor<B, 3>) -> Tensor<B, 3> {
    let device = k.device();
    let shape = k.dims();
    let values: Vec<f64> = k
        .clone()
        .into_data()
        .iter::<f64>()
        .map(|count| ln_gamma(count + 1.0))
        .collect();
    Tensor::from_data(
        TensorData::new(values, shape).convert::<B::FloatElem>(),
        &device,
    )
}
