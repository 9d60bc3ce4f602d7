use crate::epoch_tracker::EpochTracker;
use crate::error::{LentilError, Result};

use log::debug;
use std::fmt;
use std::str::FromStr;

/// Epochs for the linear schedule to reach full weight
pub const LINEAR_ANNEALING_EPOCHS: f64 = 50.0;
/// Midpoint of the sigmoid schedule
pub const SIGMOID_CENTER: f64 = 15.0;
/// Slope of the sigmoid schedule
pub const SIGMOID_SLOPE: f64 = 0.25;

/// How the KL term's weight evolves over epochs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KlAnnealing {
    /// min(1, e / 50)
    Linear,
    /// 1 / (1 + exp(-0.25 (e - 15)))
    Sigmoid,
    /// always 1
    #[default]
    Constant,
}

impl KlAnnealing {
    /// Parse an optional schedule name; `None` means constant
    pub fn parse(name: Option<&str>) -> Result<Self> {
        match name {
            None => Ok(Self::Constant),
            Some(name) => name.parse(),
        }
    }

    /// Weight after `epochs_elapsed` epoch transitions.
    ///
    /// Before the first transition the weight equals the one after it,
    /// i.e., elapsed epoch 0 is evaluated as epoch 1, so construction
    /// and the first update never disagree.
    pub fn weight(&self, epochs_elapsed: usize) -> f64 {
        let epoch = epochs_elapsed.max(1) as f64;
        match self {
            Self::Linear => (epoch / LINEAR_ANNEALING_EPOCHS).min(1.0),
            Self::Sigmoid => 1.0 / (1.0 + (-SIGMOID_SLOPE * (epoch - SIGMOID_CENTER)).exp()),
            Self::Constant => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Sigmoid => "sigmoid",
            Self::Constant => "constant",
        }
    }
}

impl FromStr for KlAnnealing {
    type Err = LentilError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Self::Linear),
            "sigmoid" => Ok(Self::Sigmoid),
            "constant" => Ok(Self::Constant),
            _ => Err(LentilError::configuration(format!(
                "anneal type {} not found",
                s
            ))),
        }
    }
}

impl fmt::Display for KlAnnealing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Re-derives the KL weight once per epoch transition
#[derive(Debug)]
pub struct KlWeightScheduler {
    schedule: KlAnnealing,
    epoch_tracker: EpochTracker,
    epochs_elapsed: usize,
    weight: f64,
}

impl KlWeightScheduler {
    /// * `schedule` - "linear", "sigmoid", "constant" or `None`
    pub fn new(schedule: Option<&str>) -> Result<Self> {
        Ok(Self::from_schedule(KlAnnealing::parse(schedule)?))
    }

    pub fn from_schedule(schedule: KlAnnealing) -> Self {
        Self {
            schedule,
            epoch_tracker: EpochTracker::default(),
            epochs_elapsed: 0,
            weight: schedule.weight(0),
        }
    }

    /// Step with the configured schedule; `true` on a transition
    pub fn update(&mut self, epoch_num: usize) -> bool {
        self.transition(epoch_num, self.schedule)
    }

    /// Step with a schedule given by name. The name is validated on
    /// every call, transition or not, and replaces the configured one.
    pub fn update_with(&mut self, epoch_num: usize, schedule: Option<&str>) -> Result<bool> {
        let schedule = KlAnnealing::parse(schedule)?;
        Ok(self.transition(epoch_num, schedule))
    }

    fn transition(&mut self, epoch_num: usize, schedule: KlAnnealing) -> bool {
        self.schedule = schedule;
        if !self.epoch_tracker.advance(epoch_num) {
            return false;
        }
        let previous = self.weight;
        self.epochs_elapsed += 1;
        self.weight = schedule.weight(self.epochs_elapsed);
        debug!(
            "epoch {}: KL weight {:.4} -> {:.4} ({})",
            epoch_num, previous, self.weight, schedule
        );
        true
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn epochs_elapsed(&self) -> usize {
        self.epochs_elapsed
    }

    pub fn schedule(&self) -> KlAnnealing {
        self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_reaches_one_at_fifty() {
        let mut sched = KlWeightScheduler::new(Some("linear")).unwrap();
        assert_eq!(sched.weight(), 1.0 / 50.0);

        let mut weights = vec![];
        for e in 0..=50 {
            sched.update(e);
            weights.push(sched.weight());
        }
        assert_eq!(weights[0], 1.0 / 50.0);
        for e in 1..=50 {
            assert_eq!(weights[e], e as f64 / 50.0);
        }
        assert_eq!(weights[50], 1.0);

        for e in 51..80 {
            sched.update(e);
            assert_eq!(sched.weight(), 1.0);
        }
    }

    #[test]
    fn test_same_epoch_does_not_advance() {
        let mut sched = KlWeightScheduler::new(Some("linear")).unwrap();
        for _ in 0..5 {
            sched.update(3);
        }
        assert_eq!(sched.epochs_elapsed(), 1);
        assert_eq!(sched.weight(), 1.0 / 50.0);
        sched.update(4);
        assert_eq!(sched.weight(), 2.0 / 50.0);
    }

    #[test]
    fn test_sigmoid_centered_at_fifteen() {
        let mut sched = KlWeightScheduler::new(Some("sigmoid")).unwrap();
        let w0 = 1.0 / (1.0 + (-0.25f64 * (1.0 - 15.0)).exp());
        assert_eq!(sched.weight(), w0);

        for e in 1..=15 {
            sched.update(e);
        }
        approx::assert_abs_diff_eq!(sched.weight(), 0.5, epsilon = 1e-12);

        let mut prev = sched.weight();
        for e in 16..100 {
            sched.update(e);
            assert!(sched.weight() >= prev && sched.weight() <= 1.0);
            prev = sched.weight();
        }
        assert!(prev > 0.99);
    }

    #[test]
    fn test_constant_and_unset() {
        for name in [None, Some("constant")] {
            let mut sched = KlWeightScheduler::new(name).unwrap();
            assert_eq!(sched.weight(), 1.0);
            for e in [0, 5, 5, 2, 100] {
                sched.update_with(e, name).unwrap();
                assert_eq!(sched.weight(), 1.0);
            }
        }
    }

    #[test]
    fn test_unknown_schedule_is_configuration_error() {
        let err = KlWeightScheduler::new(Some("cosine")).unwrap_err();
        assert!(err.is_configuration());

        let mut sched = KlWeightScheduler::new(Some("linear")).unwrap();
        // rejected even when the epoch does not change
        assert!(sched.update_with(0, Some("cosine")).unwrap_err().is_configuration());
        assert!(sched.update_with(1, Some("cosine")).unwrap_err().is_configuration());
        assert_eq!(sched.epochs_elapsed(), 0);
    }
}
