//! Named registry of pools with background population and usage reporting.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::binding::Poolable;
use crate::config::{PoolConfig, PoolDescriptor, PopulationMode, UsageReporting};
use crate::error::{Error, Result};
use crate::lifecycle::Lifecycle;
use crate::pool::{ObjectPool, Released, SharedPool};
use crate::populate::{IncrementalPopulation, PopulationOutcome, spawn_incremental};
use crate::usage::{UsageReport, UsageSampler};

// ---------------------------------------------------------------------------
// ManagedPool
// ---------------------------------------------------------------------------

struct ManagedPool<T, P> {
    pool: SharedPool<T, P>,
    reporting: UsageReporting,
    cancel: CancellationToken,
    population: Option<JoinHandle<PopulationOutcome>>,
    sampler: Option<JoinHandle<()>>,
}

impl<T, P> ManagedPool<T, P>
where
    T: Clone + PartialEq,
{
    /// Stop background tasks and wait for them to exit.
    async fn stop(&mut self, name: &str) {
        self.cancel.cancel();

        if let Some(population) = self.population.take() {
            match population.await {
                Ok(outcome) => debug!(pool = name, %outcome, "Population task finished"),
                Err(error) => warn!(pool = name, %error, "Population task panicked"),
            }
        }
        if let Some(sampler) = self.sampler.take()
            && let Err(error) = sampler.await
        {
            warn!(pool = name, %error, "Usage sampler panicked");
        }
    }

    fn log_usage(&self, name: &str) -> Option<UsageReport> {
        let report = self.pool.lock().usage_report()?;
        match (self.reporting.log_peak, self.reporting.log_average) {
            (true, true) => info!(
                pool = name,
                peak_active = report.peak_active,
                average_active = ?report.average_active,
                samples = report.samples,
                "Pool usage"
            ),
            (true, false) => info!(pool = name, peak_active = report.peak_active, "Pool usage"),
            (false, true) => info!(
                pool = name,
                average_active = ?report.average_active,
                samples = report.samples,
                "Pool usage"
            ),
            (false, false) => {}
        }
        Some(report)
    }
}

// ---------------------------------------------------------------------------
// PoolManager
// ---------------------------------------------------------------------------

/// Usage figures for one pool, collected at shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport {
    /// Pool name
    pub name: String,
    /// The pool's usage at shutdown
    pub usage: UsageReport,
}

/// Registry of named pools sharing one item type.
///
/// Registration that starts background work (incremental population or
/// average sampling) needs a Tokio runtime and is rejected outside one.
/// Lifecycle hooks run under the pool's lock and must not call back into the
/// same pool.
///
/// Dropping the manager cancels its background tasks; call
/// [`shutdown`](Self::shutdown) to also wait for them, report usage and
/// destroy the pooled items.
pub struct PoolManager<T, P = ()> {
    pools: DashMap<String, ManagedPool<T, P>>,
    cancel: CancellationToken,
}

impl<T, P> Default for PoolManager<T, P> {
    fn default() -> Self {
        Self {
            pools: DashMap::new(),
            cancel: CancellationToken::new(),
        }
    }
}

impl<T, P> PoolManager<T, P>
where
    T: Clone + PartialEq + Send + 'static,
    P: 'static,
{
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool and start populating it.
    ///
    /// Bulk population creates `descriptor.pool.starting_count` items before
    /// returning; incremental population spawns a background task. Usage is
    /// tracked whenever the descriptor asks for a report.
    ///
    /// # Errors
    /// - [`Error::Configuration`] for an invalid descriptor, or when
    ///   background work is requested outside a Tokio runtime.
    /// - [`Error::DuplicatePool`] if the name is taken.
    /// - [`Error::Create`] if bulk population fails.
    pub fn register(&self, descriptor: PoolDescriptor, lifecycle: Lifecycle<T, P>) -> Result<()> {
        descriptor.validate()?;
        if self.pools.contains_key(&descriptor.name) {
            return Err(Error::DuplicatePool {
                pool: descriptor.name,
            });
        }

        let PoolDescriptor {
            name,
            pool: config,
            population,
            reporting,
        } = descriptor;
        let starting_count = config.starting_count;
        let config = PoolConfig {
            starting_count: 0,
            track_usage: config.track_usage || reporting.is_enabled(),
            ..config
        };
        let max_size = config.max_size;
        let overflow_mode = config.overflow_mode;

        let spawns_population =
            matches!(population, PopulationMode::Incremental { .. }) && starting_count > 0;
        if (spawns_population || reporting.log_average)
            && tokio::runtime::Handle::try_current().is_err()
        {
            return Err(Error::configuration(format!(
                "pool '{name}' needs a Tokio runtime for background population or sampling"
            )));
        }

        let pool = ObjectPool::new(config, lifecycle)?.into_shared();
        let cancel = self.cancel.child_token();

        let population = match population {
            PopulationMode::Bulk => {
                let populated = pool.lock().populate_many(starting_count)?;
                debug!(pool = %name, populated, "Populated pool in bulk");
                None
            }
            PopulationMode::Incremental { .. } if starting_count == 0 => None,
            PopulationMode::Incremental {
                batch_size,
                batch_interval,
            } => {
                let task = IncrementalPopulation::new(starting_count, batch_size)?;
                Some(spawn_incremental(
                    Arc::downgrade(&pool),
                    task,
                    batch_interval,
                    cancel.clone(),
                ))
            }
        };

        let sampler = if reporting.log_average {
            let sampler = UsageSampler::new(reporting.sample_interval, cancel.clone())?;
            Some(sampler.start(Arc::downgrade(&pool)))
        } else {
            None
        };

        match self.pools.entry(name.clone()) {
            Entry::Occupied(_) => {
                cancel.cancel();
                Err(Error::DuplicatePool { pool: name })
            }
            Entry::Vacant(slot) => {
                slot.insert(ManagedPool {
                    pool,
                    reporting,
                    cancel,
                    population,
                    sampler,
                });
                info!(
                    pool = %name,
                    max_size,
                    %overflow_mode,
                    starting_count,
                    "Registered pool"
                );
                Ok(())
            }
        }
    }

    /// Shared handle to a registered pool.
    pub fn pool(&self, name: &str) -> Option<SharedPool<T, P>> {
        self.pools.get(name).map(|entry| Arc::clone(&entry.pool))
    }

    /// Whether a pool is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.pools.contains_key(name)
    }

    /// Registered pool names, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.pools.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered pools.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether no pools are registered.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    // Clone the Arc out so the DashMap shard lock is released before the
    // pool lock is taken.
    fn with_pool<R>(&self, name: &str, f: impl FnOnce(&mut ObjectPool<T, P>) -> R) -> Result<R> {
        let pool = self.pool(name).ok_or_else(|| Error::UnknownPool {
            pool: name.to_string(),
        })?;
        let mut guard = pool.lock();
        Ok(f(&mut *guard))
    }

    /// Get an item from the named pool; see [`ObjectPool::get`].
    pub fn get(&self, name: &str) -> Result<Option<T>> {
        self.with_pool(name, ObjectPool::get)?
    }

    /// Get an item with placement params; see [`ObjectPool::get_placed`].
    pub fn get_placed(&self, name: &str, placement: &P) -> Result<Option<T>> {
        self.with_pool(name, |pool| pool.get_placed(placement))?
    }

    /// Get an item if one is available; see [`ObjectPool::try_get`].
    pub fn try_get(&self, name: &str) -> Result<Option<T>> {
        self.with_pool(name, ObjectPool::try_get)?
    }

    /// Get up to `amount` items; see [`ObjectPool::get_many`].
    ///
    /// # Errors
    /// [`Error::UnknownPool`], or [`Error::Create`] if the create hook fails.
    /// Items checked out before a create failure are released back to the
    /// pool, so a failed call leaves nothing checked out on the caller's
    /// behalf.
    pub fn get_many(&self, name: &str, amount: usize) -> Result<Vec<T>> {
        self.with_pool(name, |pool| {
            let mut items = Vec::new();
            let mut failure = None;
            for result in pool.get_many(amount) {
                match result {
                    Ok(item) => items.push(item),
                    Err(error) => failure = Some(error),
                }
            }
            let Some(error) = failure else {
                return Ok(items);
            };
            for item in &items {
                pool.release(item);
            }
            debug!(
                pool = name,
                returned = items.len(),
                %error,
                "Returned partial batch after create failure"
            );
            Err(error)
        })?
    }

    /// Return an item to the named pool.
    ///
    /// Releasing into an unknown pool is ignored like any foreign release.
    pub fn release(&self, name: &str, item: &T) -> Released {
        self.with_pool(name, |pool| pool.release(item))
            .unwrap_or(Released::Ignored)
    }

    /// Destroy every item in the named pool. Returns `false` for an unknown
    /// pool.
    pub fn clear(&self, name: &str) -> bool {
        self.with_pool(name, ObjectPool::clear).is_ok()
    }

    /// Total item count of the named pool.
    pub fn count_all(&self, name: &str) -> Option<usize> {
        self.with_pool(name, |pool| pool.count_all()).ok()
    }

    /// Active item count of the named pool.
    pub fn count_active(&self, name: &str) -> Option<usize> {
        self.with_pool(name, |pool| pool.count_active()).ok()
    }

    /// Inactive item count of the named pool.
    pub fn count_inactive(&self, name: &str) -> Option<usize> {
        self.with_pool(name, |pool| pool.count_inactive()).ok()
    }

    /// Current max size of the named pool.
    pub fn max_size(&self, name: &str) -> Option<usize> {
        self.with_pool(name, |pool| pool.max_size()).ok()
    }

    /// Usage snapshot of the named pool, if it tracks usage.
    pub fn usage(&self, name: &str) -> Option<UsageReport> {
        self.with_pool(name, |pool| pool.usage_report()).ok().flatten()
    }

    /// Stop background work, report usage and destroy every pooled item.
    ///
    /// Returns the usage of each pool that tracked it. The manager is empty
    /// afterwards and can be reused.
    #[tracing::instrument(skip(self), fields(pools = self.pools.len()))]
    pub async fn shutdown(&self) -> Vec<PoolReport> {
        for entry in &self.pools {
            entry.cancel.cancel();
        }

        let mut reports = Vec::new();
        for name in self.names() {
            let Some((name, mut managed)) = self.pools.remove(&name) else {
                continue;
            };
            managed.stop(&name).await;
            if let Some(usage) = managed.log_usage(&name) {
                reports.push(PoolReport {
                    name: name.clone(),
                    usage,
                });
            }
            managed.pool.lock().clear();
        }

        info!(reported = reports.len(), "Pool manager shut down");
        reports
    }
}

impl<T, P> PoolManager<T, P>
where
    T: Poolable + Clone + PartialEq + Send + 'static,
    P: 'static,
{
    /// Register a pool whose items are bound to its name on creation.
    ///
    /// # Errors
    /// As [`register`](Self::register). Creating an item that is already
    /// bound elsewhere fails with [`Error::Create`] wrapping
    /// [`Error::AlreadyBound`].
    pub fn register_bound(
        &self,
        descriptor: PoolDescriptor,
        lifecycle: Lifecycle<T, P>,
    ) -> Result<()> {
        let owner = descriptor.name.clone();
        let lifecycle = lifecycle.map_create(move |item: T| {
            item.binding().bind(owner.clone())?;
            Ok(item)
        });
        self.register(descriptor, lifecycle)
    }

    /// Return an item to the pool it is bound to.
    ///
    /// Unbound items are ignored.
    pub fn release_bound(&self, item: &T) -> Released {
        match item.owner() {
            Some(owner) => self.release(owner, item),
            None => Released::Ignored,
        }
    }
}

impl<T, P> Drop for PoolManager<T, P> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<T, P> fmt::Debug for PoolManager<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManager")
            .field("pool_count", &self.pools.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
