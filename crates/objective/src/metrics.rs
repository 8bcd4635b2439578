use burn::prelude::*;

use crate::objective::LossComponents;
use crate::schedule::ScheduleWeights;

/// Batch-averaged KL may dip below zero by float error only.
const KL_NEGATIVE_TOLERANCE: f64 = 1e-4;

/// Host-side view of one evaluation, for logging and health checks.
#[derive(Debug, Clone)]
pub struct ObjectiveMetrics {
    pub reconstruction: f64,
    pub kl: f64,
    pub l2: f64,
    pub total: f64,
    pub kl_weight: f64,
    pub l2_weight: f64,
}

impl ObjectiveMetrics {
    /// Extract scalar values from loss tensors.
    pub fn compute<B: Backend>(components: &LossComponents<B>, weights: ScheduleWeights) -> Self {
        let reconstruction: f64 = components.reconstruction.clone().into_scalar().elem();
        let kl: f64 = components.kl.clone().into_scalar().elem();
        let l2: f64 = components.l2.clone().into_scalar().elem();
        Self {
            reconstruction,
            kl,
            l2,
            total: reconstruction + kl + l2,
            kl_weight: weights.kl,
            l2_weight: weights.l2,
        }
    }

    /// Warnings for values that indicate a diverging or misconfigured run.
    pub fn health_check(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (name, value) in [
            ("reconstruction", self.reconstruction),
            ("kl", self.kl),
            ("l2", self.l2),
        ] {
            if !value.is_finite() {
                warnings.push(format!("{name} loss is not finite ({value})"));
            }
        }
        if self.kl < -KL_NEGATIVE_TOLERANCE {
            warnings.push(format!("kl loss is negative ({:.6})", self.kl));
        }
        if self.l2 < 0.0 {
            warnings.push(format!("l2 loss is negative ({:.6})", self.l2));
        }
        warnings
    }

    /// Emit health-check warnings at `warn` level. Returns whether the check passed.
    pub fn log_health(&self, step: usize) -> bool {
        let warnings = self.health_check();
        if !warnings.is_empty() {
            tracing::warn!(step, "Objective health check warnings: {:?}", warnings);
        }
        warnings.is_empty()
    }

    pub fn display(&self) -> String {
        format!(
            "loss={:.4} recon={:.4} kl={:.4} l2={:.4} kl_w={:.3} l2_w={:.3}",
            self.total, self.reconstruction, self.kl, self.l2, self.kl_weight, self.l2_weight
        )
    }
}
