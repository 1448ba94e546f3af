//! Pool configuration types

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::overflow::OverflowMode;

/// Items created up front when no starting count is given.
pub const DEFAULT_STARTING_COUNT: usize = 50;
/// `max_size` step used by [`OverflowMode::IncreaseSize`] unless configured.
pub const DEFAULT_SIZE_INCREMENT: usize = 50;
/// Ring-buffer capacity for active-count samples.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 1024;
/// Period between active-count samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a single object pool
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Items created and released into the pool at construction
    pub starting_count: usize,
    /// Capacity, counting both active and inactive items
    pub max_size: usize,
    /// Behavior when a new slot is needed at capacity
    pub overflow_mode: OverflowMode,
    /// Growth step for [`OverflowMode::IncreaseSize`]
    pub size_increment: usize,
    /// Record peak and sampled active counts
    pub track_usage: bool,
    /// Number of active-count samples retained
    pub sample_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            starting_count: DEFAULT_STARTING_COUNT,
            max_size: DEFAULT_STARTING_COUNT,
            overflow_mode: OverflowMode::default(),
            size_increment: DEFAULT_SIZE_INCREMENT,
            track_usage: false,
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with the given capacity and mode and no prefill.
    #[must_use]
    pub fn new(max_size: usize, overflow_mode: OverflowMode) -> Self {
        Self {
            starting_count: 0,
            max_size,
            overflow_mode,
            ..Default::default()
        }
    }

    /// Create a growth-mode configuration with an explicit increment.
    #[must_use]
    pub fn growing(max_size: usize, size_increment: usize) -> Self {
        Self {
            starting_count: 0,
            max_size,
            overflow_mode: OverflowMode::IncreaseSize,
            size_increment,
            ..Default::default()
        }
    }

    /// Set the number of items created at construction
    pub fn with_starting_count(mut self, starting_count: usize) -> Self {
        self.starting_count = starting_count;
        self
    }

    /// Set the growth step
    pub fn with_size_increment(mut self, size_increment: usize) -> Self {
        self.size_increment = size_increment;
        self
    }

    /// Enable or disable usage tracking
    pub fn with_usage_tracking(mut self, track_usage: bool) -> Self {
        self.track_usage = track_usage;
        self
    }

    /// Set the number of retained samples
    pub fn with_sample_capacity(mut self, sample_capacity: usize) -> Self {
        self.sample_capacity = sample_capacity;
        self
    }

    /// Validate pool configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.track_usage && self.sample_capacity == 0 {
            return Err(Error::configuration(
                "sample_capacity must be greater than 0 when usage tracking is enabled",
            ));
        }
        Ok(())
    }
}

/// How a managed pool is filled with its starting items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PopulationMode {
    /// Create every starting item synchronously during registration
    #[default]
    Bulk,
    /// Create starting items in batches on a background task, yielding
    /// between batches
    Incremental {
        /// Items created per batch
        batch_size: usize,
        /// Pause between batches; zero yields once to the scheduler
        batch_interval: Duration,
    },
}

impl PopulationMode {
    /// Incremental population yielding to the scheduler between batches.
    #[must_use]
    pub fn incremental(batch_size: usize) -> Self {
        Self::Incremental {
            batch_size,
            batch_interval: Duration::ZERO,
        }
    }

    /// Validate population settings.
    pub fn validate(&self) -> Result<()> {
        if let Self::Incremental { batch_size: 0, .. } = self {
            return Err(Error::configuration("batch_size must be at least 1"));
        }
        Ok(())
    }
}

/// Which usage figures a managed pool reports at shutdown
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UsageReporting {
    /// Report the highest concurrent active count
    pub log_peak: bool,
    /// Sample the active count and report its average
    pub log_average: bool,
    /// Period between samples
    pub sample_interval: Duration,
}

impl Default for UsageReporting {
    fn default() -> Self {
        Self {
            log_peak: false,
            log_average: false,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

impl UsageReporting {
    /// Whether the pool needs usage tracking at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.log_peak || self.log_average
    }

    /// Validate reporting settings.
    pub fn validate(&self) -> Result<()> {
        if self.log_average && self.sample_interval.is_zero() {
            return Err(Error::configuration(
                "sample_interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Declarative definition of a managed pool
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolDescriptor {
    /// Unique pool name within a manager
    pub name: String,
    /// Capacity and overflow settings; `starting_count` is filled per
    /// `population`
    #[cfg_attr(feature = "serde", serde(default))]
    pub pool: PoolConfig,
    /// How the starting items are created
    #[cfg_attr(feature = "serde", serde(default))]
    pub population: PopulationMode,
    /// Usage figures reported at shutdown
    #[cfg_attr(feature = "serde", serde(default))]
    pub reporting: UsageReporting,
}

impl PoolDescriptor {
    /// Create a descriptor with default settings.
    pub fn new(name: impl Into<String>, pool: PoolConfig) -> Self {
        Self {
            name: name.into(),
            pool,
            population: PopulationMode::default(),
            reporting: UsageReporting::default(),
        }
    }

    /// Set the population mode
    pub fn with_population(mut self, population: PopulationMode) -> Self {
        self.population = population;
        self
    }

    /// Set the reporting flags
    pub fn with_reporting(mut self, reporting: UsageReporting) -> Self {
        self.reporting = reporting;
        self
    }

    /// Validate the whole descriptor.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::configuration("pool name cannot be empty"));
        }
        self.pool.validate()?;
        self.population.validate()?;
        self.reporting.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.starting_count, 50);
        assert_eq!(config.size_increment, 50);
        assert_eq!(config.overflow_mode, OverflowMode::StealFromActive);
        config.validate().unwrap();
    }

    #[test]
    fn growing_config_uses_increase_size() {
        let config = PoolConfig::growing(10, 4);
        assert_eq!(config.overflow_mode, OverflowMode::IncreaseSize);
        assert_eq!(config.size_increment, 4);
        assert_eq!(config.starting_count, 0);
    }

    #[test]
    fn zero_sample_capacity_rejected_when_tracking() {
        let config = PoolConfig::new(5, OverflowMode::HardLimit)
            .with_usage_tracking(true)
            .with_sample_capacity(0);
        assert!(config.validate().is_err());

        let untracked = PoolConfig::new(5, OverflowMode::HardLimit).with_sample_capacity(0);
        untracked.validate().unwrap();
    }

    #[test]
    fn zero_batch_size_rejected() {
        assert!(PopulationMode::incremental(0).validate().is_err());
        PopulationMode::incremental(1).validate().unwrap();
        PopulationMode::Bulk.validate().unwrap();
    }

    #[test]
    fn zero_sample_interval_rejected_for_average() {
        let reporting = UsageReporting {
            log_average: true,
            sample_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(reporting.validate().is_err());
    }

    #[test]
    fn empty_name_rejected() {
        let descriptor = PoolDescriptor::new("", PoolConfig::default());
        assert!(descriptor.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn descriptor_loads_from_partial_json() {
        let descriptor: PoolDescriptor = serde_json::from_str(
            r#"{
                "name": "bullets",
                "pool": { "max_size": 20, "overflow_mode": "IncreaseSize" },
                "population": { "Incremental": { "batch_size": 4, "batch_interval": { "secs": 0, "nanos": 0 } } },
                "reporting": { "log_peak": true }
            }"#,
        )
        .unwrap();

        assert_eq!(descriptor.name, "bullets");
        assert_eq!(descriptor.pool.max_size, 20);
        assert_eq!(descriptor.pool.starting_count, DEFAULT_STARTING_COUNT);
        assert_eq!(descriptor.pool.overflow_mode, OverflowMode::IncreaseSize);
        assert_eq!(descriptor.population, PopulationMode::incremental(4));
        assert!(descriptor.reporting.log_peak);
        assert_eq!(descriptor.reporting.sample_interval, DEFAULT_SAMPLE_INTERVAL);
        descriptor.validate().unwrap();
    }
}
