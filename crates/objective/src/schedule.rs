//! Linear annealing schedules for the KL and L2 regularization weights.
//!
//! Each term ramps with training step as
//! `clamp(max(step - start, 0) / duration, min_weight, max_weight)`.
//! The ramp progress is compared directly against the weight bounds, so with
//! `max_weight = 1.0` the weight saturates exactly at `start + duration`.
//! For other bounds the effective ramp length differs from `duration`.

use std::fmt;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ObjectiveError;

/// The two scheduled regularization terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegularizationTerm {
    Kl,
    L2,
}

impl RegularizationTerm {
    pub const ALL: [RegularizationTerm; 2] = [RegularizationTerm::Kl, RegularizationTerm::L2];

    pub fn name(self) -> &'static str {
        match self {
            Self::Kl => "kl",
            Self::L2 => "l2",
        }
    }
}

impl fmt::Display for RegularizationTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Schedule configuration for one regularization term.
#[derive(Config, Debug)]
pub struct TermScheduleConfig {
    /// Weight before the first update.
    #[config(default = 0.0)]
    pub initial_weight: f64,
    /// Lower clamp on the scheduled weight.
    #[config(default = 0.0)]
    pub min_weight: f64,
    /// Upper clamp on the scheduled weight.
    #[config(default = 1.0)]
    pub max_weight: f64,
    /// Training step at which the ramp begins.
    #[config(default = 0)]
    pub schedule_start: usize,
    /// Number of steps for the ramp progress to go from 0 to 1.
    #[config(default = 2000)]
    pub schedule_duration: usize,
}

impl TermScheduleConfig {
    /// A schedule whose floor is its initial weight.
    pub fn anchored(initial_weight: f64) -> Self {
        Self::new()
            .with_initial_weight(initial_weight)
            .with_min_weight(initial_weight)
    }

    /// Reject configurations the ramp cannot honor.
    pub fn validate(&self, term: RegularizationTerm) -> Result<(), ObjectiveError> {
        for (field, value) in [
            ("initial_weight", self.initial_weight),
            ("min_weight", self.min_weight),
            ("max_weight", self.max_weight),
        ] {
            if !value.is_finite() {
                return Err(ObjectiveError::NonFiniteWeight { term, field, value });
            }
        }
        if self.min_weight > self.max_weight {
            return Err(ObjectiveError::InvalidWeightBounds {
                term,
                min: self.min_weight,
                max: self.max_weight,
            });
        }
        if self.schedule_duration == 0 {
            return Err(ObjectiveError::InvalidScheduleDuration { term });
        }
        Ok(())
    }

    /// Scheduled weight at `step`, without touching any state.
    pub fn weight_at(&self, step: usize) -> f64 {
        let effective_step = step.saturating_sub(self.schedule_start);
        let progress = effective_step as f64 / self.schedule_duration as f64;
        progress.min(self.max_weight).max(self.min_weight)
    }
}

/// A validated schedule together with its current weight.
#[derive(Debug, Clone)]
pub struct TermSchedule {
    config: TermScheduleConfig,
    weight: f64,
}

impl TermSchedule {
    pub fn new(
        term: RegularizationTerm,
        config: TermScheduleConfig,
    ) -> Result<Self, ObjectiveError> {
        config.validate(term)?;
        let weight = config.initial_weight;
        Ok(Self { config, weight })
    }

    pub fn config(&self) -> &TermScheduleConfig {
        &self.config
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    fn update(&mut self, step: usize) -> f64 {
        self.weight = self.config.weight_at(step);
        self.weight
    }
}

/// Snapshot of both scheduled weights, pinned to one training step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleWeights {
    pub kl: f64,
    pub l2: f64,
}

impl ScheduleWeights {
    pub fn get(&self, term: RegularizationTerm) -> f64 {
        match term {
            RegularizationTerm::Kl => self.kl,
            RegularizationTerm::L2 => self.l2,
        }
    }
}

/// Holds the KL and L2 schedules and their current weights.
///
/// Owned by the training-loop driver. `update` is called once per step,
/// before that step's evaluation reads the weights.
#[derive(Debug, Clone)]
pub struct WeightScheduler {
    kl: TermSchedule,
    l2: TermSchedule,
}

impl WeightScheduler {
    pub fn new(kl: TermScheduleConfig, l2: TermScheduleConfig) -> Result<Self, ObjectiveError> {
        Ok(Self {
            kl: TermSchedule::new(RegularizationTerm::Kl, kl)?,
            l2: TermSchedule::new(RegularizationTerm::L2, l2)?,
        })
    }

    pub fn term(&self, term: RegularizationTerm) -> &TermSchedule {
        match term {
            RegularizationTerm::Kl => &self.kl,
            RegularizationTerm::L2 => &self.l2,
        }
    }

    fn term_mut(&mut self, term: RegularizationTerm) -> &mut TermSchedule {
        match term {
            RegularizationTerm::Kl => &mut self.kl,
            RegularizationTerm::L2 => &mut self.l2,
        }
    }

    /// Recompute every term's weight for `step` and return the new snapshot.
    pub fn update(&mut self, step: usize) -> ScheduleWeights {
        for term in RegularizationTerm::ALL {
            self.term_mut(term).update(step);
        }
        let weights = self.weights();
        tracing::debug!(
            step,
            kl_weight = weights.kl,
            l2_weight = weights.l2,
            "Updated regularization weights"
        );
        weights
    }

    pub fn weights(&self) -> ScheduleWeights {
        ScheduleWeights {
            kl: self.kl.weight(),
            l2: self.l2.weight(),
        }
    }

    /// Preview the weight `term` would take at `step`.
    pub fn weight_at(&self, term: RegularizationTerm, step: usize) -> f64 {
        self.term(term).config().weight_at(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: usize, duration: usize) -> TermScheduleConfig {
        TermScheduleConfig::new()
            .with_schedule_start(start)
            .with_schedule_duration(duration)
    }

    #[test]
    fn test_default_ramp_checkpoints() {
        let mut scheduler = WeightScheduler::new(ramp(0, 2000), ramp(0, 2000)).unwrap();
        for (step, expected) in [(0, 0.0), (1000, 0.5), (2000, 1.0), (5000, 1.0)] {
            let weights = scheduler.update(step);
            assert!(
                (weights.kl - expected).abs() < 1e-12,
                "step {step}: expected {expected}, got {}",
                weights.kl
            );
            assert!((weights.l2 - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_before_start_pinned_to_floor() {
        let config = ramp(500, 100).with_min_weight(0.1).with_initial_weight(0.1);
        assert_eq!(config.weight_at(0), 0.1);
        assert_eq!(config.weight_at(499), 0.1);
        assert_eq!(config.weight_at(500), 0.1);
        assert!((config.weight_at(550) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_floor_is_exactly_zero_at_start() {
        let config = ramp(300, 1000);
        assert_eq!(config.weight_at(300), 0.0);
        assert_eq!(config.weight_at(10), 0.0);
    }

    #[test]
    fn test_monotone_until_saturation() {
        let config = ramp(100, 250).with_max_weight(0.8);
        let mut prev = config.weight_at(100);
        for step in 101..1000 {
            let w = config.weight_at(step);
            assert!(w >= prev, "weight decreased at step {step}: {prev} -> {w}");
            assert!(w <= 0.8);
            prev = w;
        }
        assert_eq!(prev, 0.8);
    }

    #[test]
    fn test_progress_compared_directly_to_max() {
        // Progress 0.5 is reached at 1000 effective steps and already saturates max=0.5.
        let config = ramp(0, 2000).with_max_weight(0.5);
        assert_eq!(config.weight_at(1000), 0.5);
        // Progress above 1 is not capped by the ramp itself when max allows it.
        let config = ramp(0, 100).with_max_weight(3.0);
        assert!((config.weight_at(250) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_initial_weight_until_first_update() {
        let mut scheduler =
            WeightScheduler::new(TermScheduleConfig::anchored(0.2), ramp(0, 10)).unwrap();
        assert_eq!(scheduler.weights().kl, 0.2);
        assert_eq!(scheduler.weights().l2, 0.0);

        scheduler.update(0);
        assert_eq!(scheduler.weights().kl, 0.2, "anchored floor holds at step 0");
        scheduler.update(5);
        assert_eq!(scheduler.weights().l2, 0.5);
    }

    #[test]
    fn test_weight_at_does_not_mutate() {
        let scheduler = WeightScheduler::new(ramp(0, 10), ramp(0, 10)).unwrap();
        assert_eq!(scheduler.weight_at(RegularizationTerm::Kl, 5), 0.5);
        assert_eq!(scheduler.weights().kl, 0.0);
    }

    #[test]
    fn test_terms_scheduled_independently() {
        let mut scheduler = WeightScheduler::new(ramp(0, 100), ramp(50, 100)).unwrap();
        let weights = scheduler.update(100);
        assert_eq!(weights.get(RegularizationTerm::Kl), 1.0);
        assert_eq!(weights.get(RegularizationTerm::L2), 0.5);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let err = WeightScheduler::new(ramp(0, 10).with_min_weight(2.0), ramp(0, 10)).unwrap_err();
        assert!(matches!(
            err,
            ObjectiveError::InvalidWeightBounds { term: RegularizationTerm::Kl, .. }
        ));
    }

    #[test]
    fn test_rejects_zero_duration() {
        let err = WeightScheduler::new(ramp(0, 10), ramp(0, 0)).unwrap_err();
        assert!(matches!(
            err,
            ObjectiveError::InvalidScheduleDuration { term: RegularizationTerm::L2 }
        ));
        assert!(err.to_string().contains("l2"));
    }

    #[test]
    fn test_rejects_non_finite_weight() {
        let err = TermScheduleConfig::new()
            .with_max_weight(f64::NAN)
            .validate(RegularizationTerm::Kl)
            .unwrap_err();
        assert!(matches!(
            err,
            ObjectiveError::NonFiniteWeight { field: "max_weight", .. }
        ));
    }
}
