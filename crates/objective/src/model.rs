//! What the objective needs from a sequential latent-variable model.
//!
//! A model always exposes its generator's initial-state distributions and
//! recurrent weights. A controller is an explicit optional capability:
//! models without one keep the default `controller()` and contribute only
//! generator terms.

use burn::prelude::*;

use crate::divergence::LatentDistributions;

/// A recurrent module that can report the L2 norm of its hidden weights.
pub trait RecurrentHiddenWeights<B: Backend> {
    /// Non-negative scalar of shape `(1,)`, on the autodiff graph of the weights.
    fn hidden_weight_l2_norm(&self) -> Tensor<B, 1>;
}

/// Distributions and recurrent weights for one latent group.
pub struct LatentGroup<'a, B: Backend> {
    pub distributions: LatentDistributions<B>,
    pub recurrent: &'a dyn RecurrentHiddenWeights<B>,
}

impl<'a, B: Backend> LatentGroup<'a, B> {
    pub fn new(
        distributions: LatentDistributions<B>,
        recurrent: &'a dyn RecurrentHiddenWeights<B>,
    ) -> Self {
        Self {
            distributions,
            recurrent,
        }
    }
}

/// Model-side contract consumed by [`crate::LossObjective::evaluate`].
pub trait LatentModel<B: Backend> {
    /// Generator initial-state posterior/prior and the generator recurrence.
    fn generator(&self) -> LatentGroup<'_, B>;

    /// Controller-input posterior/prior and the controller recurrence.
    fn controller(&self) -> Option<LatentGroup<'_, B>> {
        None
    }
}
