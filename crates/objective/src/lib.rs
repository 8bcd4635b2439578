//! Training objective for LFADS-style sequential latent-variable models.
//!
//! Combines a Poisson reconstruction log-likelihood, a KL divergence between
//! diagonal-Gaussian posteriors and priors, and an L2 penalty on recurrent
//! hidden weights. KL and L2 are scaled by linear annealing schedules that
//! ramp with the training step. All tensor code is generic over
//! `B: Backend` and works under `Autodiff`.

pub mod config;
pub mod divergence;
pub mod error;
pub mod gru;
pub mod likelihood;
pub mod metrics;
pub mod model;
pub mod objective;
pub mod schedule;

pub use config::{load_objective_toml, ObjectiveToml};
pub use divergence::{kl_div_gaussian_gaussian, DiagonalGaussian, LatentDistributions};
pub use error::ObjectiveError;
pub use gru::{GruCell, GruCellConfig};
pub use likelihood::{
    loglikelihood_poisson, LogLikelihood, PoissonLikelihoodConfig, PoissonLogLikelihood,
};
pub use metrics::ObjectiveMetrics;
pub use model::{LatentGroup, LatentModel, RecurrentHiddenWeights};
pub use objective::{LossComponents, LossObjective, ObjectiveConfig};
pub use schedule::{RegularizationTerm, ScheduleWeights, TermScheduleConfig, WeightScheduler};
