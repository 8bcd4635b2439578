//! Closed-form KL divergence between diagonal Gaussians.

use burn::prelude::*;

use crate::error::ObjectiveError;

/// Diagonal Gaussian parameterised by mean and log-variance.
///
/// Both tensors have shape `(batch, latent_dim)`.
#[derive(Debug, Clone)]
pub struct DiagonalGaussian<B: Backend> {
    pub mean: Tensor<B, 2>,
    pub log_variance: Tensor<B, 2>,
}

impl<B: Backend> DiagonalGaussian<B> {
    pub fn new(mean: Tensor<B, 2>, log_variance: Tensor<B, 2>) -> Self {
        Self { mean, log_variance }
    }

    pub fn dims(&self) -> [usize; 2] {
        self.mean.dims()
    }
}

/// Posterior and prior over one latent variable group.
#[derive(Debug, Clone)]
pub struct LatentDistributions<B: Backend> {
    pub posterior: DiagonalGaussian<B>,
    pub prior: DiagonalGaussian<B>,
}

impl<B: Backend> LatentDistributions<B> {
    pub fn new(posterior: DiagonalGaussian<B>, prior: DiagonalGaussian<B>) -> Self {
        Self { posterior, prior }
    }

    /// Check that all four parameter tensors share one shape.
    pub fn validate(&self, what: &'static str) -> Result<(), ObjectiveError> {
        let expected = self.posterior.mean.dims();
        for actual in [
            self.posterior.log_variance.dims(),
            self.prior.mean.dims(),
            self.prior.log_variance.dims(),
        ] {
            if actual != expected {
                return Err(ObjectiveError::ShapeMismatch {
                    what,
                    expected: expected.to_vec(),
                    actual: actual.to_vec(),
                });
            }
        }
        Ok(())
    }

    /// KL(posterior || prior), batch-averaged and summed over latent dims.
    pub fn kl_divergence(self) -> Tensor<B, 1> {
        kl_div_gaussian_gaussian(
            self.posterior.mean,
            self.posterior.log_variance,
            self.prior.mean,
            self.prior.log_variance,
        )
    }
}

/// KL divergence between a posterior and a prior diagonal Gaussian.
///
/// Per element:
/// ```text
/// 0.5 * (prior_lv - post_lv + exp(post_lv - prior_lv)
///        + (post_mu - prior_mu)^2 / exp(prior_lv) - 1)
/// ```
/// then averaged over the batch dimension and summed over latent dimensions.
///
/// # Arguments
/// - `post_mu`, `post_lv`: posterior mean and log-variance, shape `(batch, latent_dim)`
/// - `prior_mu`, `prior_lv`: prior mean and log-variance, same shape
///
/// # Returns
/// Scalar tensor of shape `(1,)`. A prior log-variance so negative that
/// `exp(prior_lv)` underflows yields inf/NaN; no guarding is done here.
pub fn kl_div_gaussian_gaussian<B: Backend>(
    post_mu: Tensor<B, 2>,
    post_lv: Tensor<B, 2>,
    prior_mu: Tensor<B, 2>,
    prior_lv: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let variance_ratio = (post_lv.clone() - prior_lv.clone()).exp();
    let prior_std = prior_lv.clone().mul_scalar(0.5).exp();
    let scaled_mean_diff = (post_mu - prior_mu) / prior_std;

    let per_element = (prior_lv - post_lv + variance_ratio + scaled_mean_diff.powf_scalar(2.0))
        .sub_scalar(1.0)
        .mul_scalar(0.5);

    per_element.mean_dim(0).sum()
}
