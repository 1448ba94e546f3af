//! Usage tracking: peak active count and a bounded window of periodic
//! active-count samples, plus the background sampler that feeds it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::error::{Error, Result};
use crate::pool::ObjectPool;

/// Peak and sampled active counts for one pool.
#[derive(Debug, Clone)]
pub struct UsageStats {
    peak_active: usize,
    samples: VecDeque<usize>,
    capacity: usize,
}

impl UsageStats {
    /// Create empty stats retaining at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            peak_active: 0,
            samples: VecDeque::new(),
            capacity,
        }
    }

    /// Raise the peak if `active` exceeds it.
    pub fn record_active(&mut self, active: usize) {
        self.peak_active = self.peak_active.max(active);
    }

    /// Append a sample, evicting the oldest when full.
    pub fn record_sample(&mut self, active: usize) {
        if self.capacity == 0 {
            return;
        }
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(active);
    }

    /// Highest active count observed at checkout.
    #[must_use]
    pub fn peak_active(&self) -> usize {
        self.peak_active
    }

    /// Retained samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = usize> + '_ {
        self.samples.iter().copied()
    }

    /// Number of retained samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Maximum number of retained samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mean of the retained samples, rounded half-to-even.
    ///
    /// `None` until the first sample is taken.
    #[must_use]
    pub fn average_active(&self) -> Option<usize> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: usize = self.samples.iter().sum();
        let mean = sum as f64 / self.samples.len() as f64;
        Some(mean.round_ties_even() as usize)
    }

    /// Point-in-time summary.
    #[must_use]
    pub fn report(&self) -> UsageReport {
        UsageReport {
            peak_active: self.peak_active,
            average_active: self.average_active(),
            samples: self.samples.len(),
        }
    }
}

/// Summary of a pool's usage, logged at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct UsageReport {
    /// Highest concurrent active count
    pub peak_active: usize,
    /// Rounded mean of the sampled active counts
    pub average_active: Option<usize>,
    /// Number of samples the average is based on
    pub samples: usize,
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peak {}", self.peak_active)?;
        match self.average_active {
            Some(average) => write!(f, ", average {average} over {} samples", self.samples),
            None => write!(f, ", no samples"),
        }
    }
}

/// Background task that samples a pool's active count on a fixed period.
///
/// The first sample is taken immediately. The task stops when the token is
/// cancelled or the pool is dropped.
pub struct UsageSampler {
    interval: Duration,
    cancel: CancellationToken,
}

impl UsageSampler {
    /// Create a sampler with the given period.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for a zero interval.
    pub fn new(interval: Duration, cancel: CancellationToken) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::configuration(
                "sample_interval must be greater than zero",
            ));
        }
        Ok(Self { interval, cancel })
    }

    /// Sampling period.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the sampling task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<T, P>(&self, pool: Weak<Mutex<ObjectPool<T, P>>>) -> tokio::task::JoinHandle<()>
    where
        T: Clone + PartialEq + Send + 'static,
        P: 'static,
    {
        let period = self.interval;
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = cancel.cancelled() => break,
                }

                let Some(shared) = pool.upgrade() else {
                    debug!("Pool dropped, stopping usage sampler");
                    break;
                };
                let sampled = shared.lock().sample_usage();
                trace!(?sampled, "Sampled active count");
            }
        })
    }

    /// Signal the sampling task to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for UsageSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageSampler")
            .field("interval", &self.interval)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_only_rises() {
        let mut stats = UsageStats::new(4);
        stats.record_active(3);
        stats.record_active(1);
        stats.record_active(5);
        stats.record_active(2);
        assert_eq!(stats.peak_active(), 5);
    }

    #[test]
    fn oldest_sample_is_evicted() {
        let mut stats = UsageStats::new(3);
        for active in [1, 2, 3, 4] {
            stats.record_sample(active);
        }
        assert_eq!(stats.samples().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(stats.sample_count(), 3);
    }

    #[test]
    fn average_of_no_samples_is_none() {
        let stats = UsageStats::new(3);
        assert_eq!(stats.average_active(), None);
        assert_eq!(stats.report().to_string(), "peak 0, no samples");
    }

    #[test]
    fn average_rounds_half_to_even() {
        let mut stats = UsageStats::new(8);
        stats.record_sample(2);
        stats.record_sample(3);
        // 2.5 rounds down to 2
        assert_eq!(stats.average_active(), Some(2));

        let mut stats = UsageStats::new(8);
        stats.record_sample(3);
        stats.record_sample(4);
        // 3.5 rounds up to 4
        assert_eq!(stats.average_active(), Some(4));

        let mut stats = UsageStats::new(8);
        for active in [1, 1, 2] {
            stats.record_sample(active);
        }
        assert_eq!(stats.average_active(), Some(1));
    }

    #[test]
    fn report_formats_average() {
        let mut stats = UsageStats::new(4);
        stats.record_active(6);
        stats.record_sample(4);
        stats.record_sample(4);
        let report = stats.report();
        assert_eq!(
            report,
            UsageReport {
                peak_active: 6,
                average_active: Some(4),
                samples: 2
            }
        );
        assert_eq!(report.to_string(), "peak 6, average 4 over 2 samples");
    }

    #[test]
    fn huge_capacity_is_not_reserved_up_front() {
        let mut stats = UsageStats::new(usize::MAX);
        stats.record_sample(7);
        assert_eq!(stats.capacity(), usize::MAX);
        assert_eq!(stats.average_active(), Some(7));
    }

    #[test]
    fn zero_interval_rejected() {
        assert!(UsageSampler::new(Duration::ZERO, CancellationToken::new()).is_err());
    }
}
