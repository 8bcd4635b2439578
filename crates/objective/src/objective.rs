//! Composite LFADS objective: reconstruction + annealed KL + annealed L2.
//!
//! The three components are returned separately so the training loop owns
//! aggregation, logging and the backward call.

use burn::prelude::*;

use crate::error::ObjectiveError;
use crate::likelihood::LogLikelihood;
use crate::model::{LatentGroup, LatentModel};
use crate::schedule::{ScheduleWeights, TermScheduleConfig, WeightScheduler};

/// Configuration for the composite objective.
#[derive(Config, Debug)]
pub struct ObjectiveConfig {
    /// KL weight schedule.
    #[config(default = "TermScheduleConfig::new()")]
    pub kl: TermScheduleConfig,
    /// L2 weight schedule.
    #[config(default = "TermScheduleConfig::new()")]
    pub l2: TermScheduleConfig,
    /// Scale on the generator's recurrent hidden-weight L2 norm.
    #[config(default = 0.0)]
    pub l2_gen_scale: f64,
    /// Scale on the controller's recurrent hidden-weight L2 norm.
    #[config(default = 0.0)]
    pub l2_con_scale: f64,
}

impl ObjectiveConfig {
    /// Build the objective around a log-likelihood.
    pub fn init<L>(&self, likelihood: L) -> Result<LossObjective<L>, ObjectiveError> {
        let scheduler = WeightScheduler::new(self.kl.clone(), self.l2.clone())?;
        tracing::info!(
            kl_min = self.kl.min_weight,
            kl_max = self.kl.max_weight,
            kl_start = self.kl.schedule_start,
            kl_duration = self.kl.schedule_duration,
            l2_min = self.l2.min_weight,
            l2_max = self.l2.max_weight,
            l2_start = self.l2.schedule_start,
            l2_duration = self.l2.schedule_duration,
            l2_gen_scale = self.l2_gen_scale,
            l2_con_scale = self.l2_con_scale,
            "Initialized objective"
        );
        Ok(LossObjective {
            likelihood,
            scheduler,
            l2_gen_scale: self.l2_gen_scale,
            l2_con_scale: self.l2_con_scale,
        })
    }
}

/// Loss components from one evaluation, each a scalar tensor of shape `(1,)`.
#[derive(Debug, Clone)]
pub struct LossComponents<B: Backend> {
    /// Negative log-likelihood of the observed data.
    pub reconstruction: Tensor<B, 1>,
    /// Weighted KL divergence, summed over latent groups.
    pub kl: Tensor<B, 1>,
    /// Weighted recurrent hidden-weight L2 penalty.
    pub l2: Tensor<B, 1>,
}

impl<B: Backend> LossComponents<B> {
    /// Sum of all three components, ready for `backward()`.
    pub fn total(&self) -> Tensor<B, 1> {
        self.reconstruction.clone() + self.kl.clone() + self.l2.clone()
    }
}

/// Annealed objective over a pluggable reconstruction log-likelihood.
#[derive(Debug, Clone)]
pub struct LossObjective<L> {
    likelihood: L,
    scheduler: WeightScheduler,
    l2_gen_scale: f64,
    l2_con_scale: f64,
}

impl<L> LossObjective<L> {
    /// Advance both regularization schedules to `step`.
    pub fn update_schedule(&mut self, step: usize) -> ScheduleWeights {
        self.scheduler.update(step)
    }

    /// Current step-pinned weight snapshot.
    pub fn weights(&self) -> ScheduleWeights {
        self.scheduler.weights()
    }

    pub fn scheduler(&self) -> &WeightScheduler {
        &self.scheduler
    }

    pub fn likelihood(&self) -> &L {
        &self.likelihood
    }

    /// Evaluate with the scheduler's current weights.
    ///
    /// `x_original` and `x_reconstructed` are time-major: `(time, batch, channels)`.
    pub fn evaluate<B, M>(
        &self,
        x_original: Tensor<B, 3>,
        x_reconstructed: Tensor<B, 3>,
        model: &M,
    ) -> Result<LossComponents<B>, ObjectiveError>
    where
        B: Backend,
        L: LogLikelihood<B>,
        M: LatentModel<B>,
    {
        self.evaluate_with_weights(self.weights(), x_original, x_reconstructed, model)
    }

    /// Evaluate against an explicit weight snapshot.
    ///
    /// Replicas evaluating the same step share one snapshot taken by the
    /// driver after its `update_schedule` call.
    pub fn evaluate_with_weights<B, M>(
        &self,
        weights: ScheduleWeights,
        x_original: Tensor<B, 3>,
        x_reconstructed: Tensor<B, 3>,
        model: &M,
    ) -> Result<LossComponents<B>, ObjectiveError>
    where
        B: Backend,
        L: LogLikelihood<B>,
        M: LatentModel<B>,
    {
        let (original_dims, recon_dims) = (x_original.dims(), x_reconstructed.dims());
        if original_dims != recon_dims {
            return Err(ObjectiveError::ShapeMismatch {
                what: "reconstruction",
                expected: original_dims.to_vec(),
                actual: recon_dims.to_vec(),
            });
        }

        let generator = model.generator();
        generator.distributions.validate("generator latents")?;
        let controller = model.controller();
        if let Some(controller) = &controller {
            controller.distributions.validate("controller latents")?;
        }

        // Time-major in, batch-major for the likelihood's batch averaging.
        let reconstruction = self
            .likelihood
            .log_likelihood(x_original.swap_dims(0, 1), x_reconstructed.swap_dims(0, 1))
            .neg();

        let (mut kl, mut l2) = self.group_penalties(generator, weights, self.l2_gen_scale);
        if let Some(controller) = controller {
            let (con_kl, con_l2) = self.group_penalties(controller, weights, self.l2_con_scale);
            kl = kl + con_kl;
            l2 = l2 + con_l2;
        }

        Ok(LossComponents {
            reconstruction,
            kl,
            l2,
        })
    }

    fn group_penalties<B: Backend>(
        &self,
        group: LatentGroup<'_, B>,
        weights: ScheduleWeights,
        l2_scale: f64,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let l2 = group
            .recurrent
            .hidden_weight_l2_norm()
            .mul_scalar(weights.l2 * l2_scale);
        let kl = group.distributions.kl_divergence().mul_scalar(weights.kl);
        (kl, l2)
    }
}
