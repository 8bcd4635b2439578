//! TOML config loading for the objective.
//!
//! A document has optional `[kl]`, `[l2]`, `[scales]` and `[likelihood]`
//! sections. Values present override the `Config` defaults; absent values
//! keep them.

use std::path::Path;

use serde::Deserialize;

use crate::likelihood::PoissonLikelihoodConfig;
use crate::objective::ObjectiveConfig;
use crate::schedule::TermScheduleConfig;

/// Top-level structure of an objective TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct ObjectiveToml {
    #[serde(default)]
    pub kl: ScheduleOverrides,
    #[serde(default)]
    pub l2: ScheduleOverrides,
    #[serde(default)]
    pub scales: ScaleOverrides,
    #[serde(default)]
    pub likelihood: LikelihoodOverrides,
}

/// Optional overrides for one `TermScheduleConfig`.
#[derive(Debug, Default, Deserialize)]
pub struct ScheduleOverrides {
    /// Initial weight. Also becomes the floor unless `min_weight` is set.
    pub initial_weight: Option<f64>,
    pub min_weight: Option<f64>,
    pub max_weight: Option<f64>,
    pub schedule_start: Option<usize>,
    pub schedule_duration: Option<usize>,
}

/// Optional L2 scale overrides.
#[derive(Debug, Default, Deserialize)]
pub struct ScaleOverrides {
    pub l2_gen_scale: Option<f64>,
    pub l2_con_scale: Option<f64>,
}

/// Optional Poisson likelihood overrides.
#[derive(Debug, Default, Deserialize)]
pub struct LikelihoodOverrides {
    /// Time-bin width.
    pub dt: Option<f64>,
}

impl ScheduleOverrides {
    fn apply(&self) -> TermScheduleConfig {
        let mut config = match self.initial_weight {
            Some(w) => TermScheduleConfig::anchored(w),
            None => TermScheduleConfig::new(),
        };
        if let Some(w) = self.min_weight {
            config.min_weight = w;
        }
        if let Some(w) = self.max_weight {
            config.max_weight = w;
        }
        if let Some(s) = self.schedule_start {
            config.schedule_start = s;
        }
        if let Some(d) = self.schedule_duration {
            config.schedule_duration = d;
        }
        config
    }
}

impl ObjectiveToml {
    /// Objective config from defaults plus the TOML overrides.
    ///
    /// Validation happens when the config is initialized.
    pub fn build_objective_config(&self) -> ObjectiveConfig {
        let mut config = ObjectiveConfig::new()
            .with_kl(self.kl.apply())
            .with_l2(self.l2.apply());
        if let Some(s) = self.scales.l2_gen_scale {
            config.l2_gen_scale = s;
        }
        if let Some(s) = self.scales.l2_con_scale {
            config.l2_con_scale = s;
        }
        config
    }

    pub fn build_likelihood_config(&self) -> PoissonLikelihoodConfig {
        let mut config = PoissonLikelihoodConfig::new();
        if let Some(dt) = self.likelihood.dt {
            config.dt = dt;
        }
        config
    }
}

/// Load and deserialize an `ObjectiveToml` from a TOML file.
pub fn load_objective_toml(path: &Path) -> anyhow::Result<ObjectiveToml> {
    let contents = std::fs::read_to_string(path)?;
    let config: ObjectiveToml = toml::from_str(&contents)?;
    tracing::info!(path = %path.display(), "Loaded objective config");
    Ok(config)
}
