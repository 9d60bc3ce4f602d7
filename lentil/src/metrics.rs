use crate::error::{LentilError, Result};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Running statistics reported while fitting a topic model
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricName {
    /// mean KL divergence of the latent posterior from the prior
    Nkld,
    /// mean negative reconstruction log-likelihood
    Nll,
    /// negative evidence lower bound of a minibatch
    Elbo,
    /// per-token perplexity of a minibatch
    Perp,
}

impl MetricName {
    pub const ALL: [MetricName; 4] = [Self::Nkld, Self::Nll, Self::Elbo, Self::Perp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nkld => "nkld",
            Self::Nll => "nll",
            Self::Elbo => "elbo",
            Self::Perp => "perp",
        }
    }
}

impl FromStr for MetricName {
    type Err = LentilError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| LentilError::not_found(format!("metric `{}`", s)))
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arithmetic mean of everything recorded since the last reset
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Average {
    total: f64,
    count: usize,
}

impl Average {
    pub fn record(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }

    /// 0 when nothing has been recorded
    pub fn value(&self) -> f64 {
        if self.count > 0 {
            self.total / self.count as f64
        } else {
            0.0
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// current value, then reset if asked
    pub fn get_metric(&mut self, reset: bool) -> f64 {
        let ret = self.value();
        if reset {
            self.reset();
        }
        ret
    }
}

/// Named averages, keyed by [`MetricName`]
#[derive(Clone, Debug, Default)]
pub struct MetricsRegistry {
    averages: BTreeMap<MetricName, Average>,
}

impl MetricsRegistry {
    /// All of [`MetricName::ALL`] registered
    pub fn new() -> Self {
        let mut ret = Self::default();
        for name in MetricName::ALL {
            ret.register(name);
        }
        ret
    }

    /// Idempotent
    pub fn register(&mut self, name: MetricName) {
        self.averages.entry(name).or_default();
    }

    pub fn register_by_name(&mut self, name: &str) -> Result<()> {
        self.register(name.parse()?);
        Ok(())
    }

    pub fn record(&mut self, name: MetricName, value: f64) -> Result<()> {
        self.averages
            .get_mut(&name)
            .ok_or_else(|| LentilError::not_found(format!("unregistered metric `{}`", name)))?
            .record(value);
        Ok(())
    }

    pub fn record_by_name(&mut self, name: &str, value: f64) -> Result<()> {
        self.record(name.parse()?, value)
    }

    /// Current value of one metric without resetting it
    pub fn get(&self, name: &str) -> Result<f64> {
        let name: MetricName = name.parse()?;
        self.averages
            .get(&name)
            .map(Average::value)
            .ok_or_else(|| LentilError::not_found(format!("unregistered metric `{}`", name)))
    }

    /// Snapshot of every registered metric; with `reset` all of them
    /// start over afterwards
    pub fn get_all(&mut self, reset: bool) -> BTreeMap<&'static str, f64> {
        self.averages
            .iter_mut()
            .map(|(name, avg)| (name.as_str(), avg.get_metric(reset)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_with_and_without_reset() {
        let mut metrics = MetricsRegistry::new();
        metrics.record(MetricName::Nll, 1.0).unwrap();
        metrics.record(MetricName::Nll, 3.0).unwrap();

        assert_eq!(metrics.get_all(false)["nll"], 2.0);
        assert_eq!(metrics.get_all(false)["nll"], 2.0);

        let snapshot = metrics.get_all(true);
        assert_eq!(snapshot["nll"], 2.0);
        assert_eq!(snapshot.len(), 4);

        metrics.record_by_name("nll", 5.0).unwrap();
        assert_eq!(metrics.get("nll").unwrap(), 5.0);
        // untouched ones are back to zero
        assert_eq!(metrics.get("perp").unwrap(), 0.0);
    }

    #[test]
    fn test_unknown_metric_is_not_found() {
        let mut metrics = MetricsRegistry::new();
        assert!(metrics.get("accuracy").unwrap_err().is_not_found());
        assert!(metrics.record_by_name("accuracy", 1.0).unwrap_err().is_not_found());
        assert!(metrics.register_by_name("accuracy").unwrap_err().is_not_found());
    }

    #[test]
    fn test_only_registered_metrics_are_reported() {
        let mut metrics = MetricsRegistry::default();
        metrics.register_by_name("elbo").unwrap();
        metrics.register(MetricName::Elbo);
        assert!(metrics.record(MetricName::Perp, 1.0).unwrap_err().is_not_found());
        assert_eq!(metrics.get_all(true).keys().copied().collect::<Vec<_>>(), vec!["elbo"]);
    }
}
