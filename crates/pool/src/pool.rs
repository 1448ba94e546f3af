//! Object pool: active/inactive bookkeeping over caller-supplied lifecycle
//! hooks.
//!
//! Items are handles: the pool keeps a clone of every checked-out item in its
//! active set, so `T` must be cheap to clone and its `PartialEq` must express
//! identity (entity ids, `Arc::ptr_eq` wrappers and the like).

use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::PoolConfig;
use crate::error::Result;
use crate::lifecycle::Lifecycle;
use crate::overflow::{OverflowAction, OverflowMode};
use crate::usage::{UsageReport, UsageStats};

/// A pool shared with background population and sampling tasks.
///
/// Tasks hold a `Weak` to it and stop once the last strong handle is dropped.
pub type SharedPool<T, P = ()> = Arc<Mutex<ObjectPool<T, P>>>;

/// What [`ObjectPool::release`] did with an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
    /// The item was not checked out from this pool; nothing happened.
    Ignored,
    /// The item went back to the inactive queue.
    Pooled,
    /// The pool was at capacity, so the item was destroyed instead.
    Discarded,
}

/// Queue-based object pool.
///
/// Inactive items are handed out in FIFO order; active items are kept in
/// checkout order, which is what [`OverflowMode::StealFromActive`] uses to
/// pick the oldest one.
///
/// # Example
/// ```
/// use nebula_pool::{Lifecycle, ObjectPool, OverflowMode, PoolConfig};
///
/// let lifecycle = Lifecycle::<u32>::builder()
///     .on_create({
///         let mut next = 0;
///         move || {
///             next += 1;
///             Ok(next)
///         }
///     })
///     .on_take(|_, _| {})
///     .on_release(|_| {})
///     .build()?;
///
/// let mut pool = ObjectPool::new(PoolConfig::new(2, OverflowMode::HardLimit), lifecycle)?;
/// let first = pool.get()?.expect("pool has room");
/// pool.release(&first);
/// assert_eq!(pool.count_inactive(), 1);
/// # Ok::<(), nebula_pool::Error>(())
/// ```
pub struct ObjectPool<T, P = ()> {
    inactive: VecDeque<T>,
    active: Vec<T>,
    max_size: usize,
    overflow_mode: OverflowMode,
    size_increment: usize,
    lifecycle: Lifecycle<T, P>,
    usage: Option<UsageStats>,
}

impl<T, P> ObjectPool<T, P>
where
    T: Clone + PartialEq,
{
    /// Create a pool and prefill `config.starting_count` inactive items.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`](crate::Error::Configuration) for an
    /// invalid config and [`Error::Create`](crate::Error::Create) if the
    /// create hook fails during prefill.
    pub fn new(config: PoolConfig, lifecycle: Lifecycle<T, P>) -> Result<Self> {
        config.validate()?;

        let mut pool = Self {
            inactive: VecDeque::new(),
            active: Vec::new(),
            max_size: config.max_size,
            overflow_mode: config.overflow_mode,
            size_increment: config.size_increment,
            lifecycle,
            usage: config
                .track_usage
                .then(|| UsageStats::new(config.sample_capacity)),
        };

        let prefilled = pool.populate_many(config.starting_count)?;
        debug!(
            requested = config.starting_count,
            prefilled,
            max_size = pool.max_size,
            overflow_mode = %pool.overflow_mode,
            "Created object pool"
        );
        Ok(pool)
    }

    /// Wrap the pool for sharing with background tasks.
    #[must_use]
    pub fn into_shared(self) -> SharedPool<T, P> {
        Arc::new(Mutex::new(self))
    }

    /// Total number of active and inactive items.
    #[must_use]
    pub fn count_all(&self) -> usize {
        self.active.len() + self.inactive.len()
    }

    /// Number of items currently checked out.
    #[must_use]
    pub fn count_active(&self) -> usize {
        self.active.len()
    }

    /// Number of items available for checkout.
    #[must_use]
    pub fn count_inactive(&self) -> usize {
        self.inactive.len()
    }

    /// Current capacity. Only [`OverflowMode::IncreaseSize`] changes it.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The pool's overflow mode.
    #[must_use]
    pub fn overflow_mode(&self) -> OverflowMode {
        self.overflow_mode
    }

    /// Growth step used by [`OverflowMode::IncreaseSize`].
    #[must_use]
    pub fn size_increment(&self) -> usize {
        self.size_increment
    }

    /// Whether `item` is currently checked out from this pool.
    #[must_use]
    pub fn is_active(&self, item: &T) -> bool {
        self.active.contains(item)
    }

    /// Usage statistics, if tracking is enabled.
    #[must_use]
    pub fn usage(&self) -> Option<&UsageStats> {
        self.usage.as_ref()
    }

    /// Snapshot of the usage statistics, if tracking is enabled.
    #[must_use]
    pub fn usage_report(&self) -> Option<UsageReport> {
        self.usage.as_ref().map(UsageStats::report)
    }

    /// Get an item, creating one if the pool allows it.
    ///
    /// Returns `Ok(None)` when the overflow policy refuses; that is the
    /// expected "exhausted" outcome, not an error.
    ///
    /// # Errors
    /// Returns [`Error::Create`](crate::Error::Create) if the create hook fails.
    pub fn get(&mut self) -> Result<Option<T>> {
        self.checkout(None)
    }

    /// Like [`get`](Self::get), forwarding placement params to the take hook.
    pub fn get_placed(&mut self, placement: &P) -> Result<Option<T>> {
        self.checkout(Some(placement))
    }

    /// Lazily get up to `amount` items.
    ///
    /// The iterator stops the first time the pool is exhausted, so it may
    /// yield fewer than `amount` items. A create failure is yielded once and
    /// ends the sequence.
    pub fn get_many(&mut self, amount: usize) -> GetMany<'_, T, P> {
        GetMany {
            pool: self,
            remaining: amount,
        }
    }

    /// Get an item if one is available.
    ///
    /// `Ok(Some(_))` and `Ok(None)` answer "was an item obtained"; exhaustion
    /// is never an error. Use [`Option::is_some`] for a plain yes or no.
    ///
    /// # Errors
    /// Returns [`Error::Create`](crate::Error::Create) if the create hook fails.
    pub fn try_get(&mut self) -> Result<Option<T>> {
        let item = self.get()?;
        if item.is_none() {
            trace!(
                active = self.active.len(),
                max_size = self.max_size,
                "try_get found nothing available"
            );
        }
        Ok(item)
    }

    fn checkout(&mut self, placement: Option<&P>) -> Result<Option<T>> {
        loop {
            if let Some(item) = self.inactive.pop_front() {
                self.lifecycle.take(&item, placement);
                self.active.push(item.clone());
                if let Some(usage) = self.usage.as_mut() {
                    usage.record_active(self.active.len());
                }
                trace!(
                    active = self.active.len(),
                    inactive = self.inactive.len(),
                    "Item taken from pool"
                );
                return Ok(Some(item));
            }

            if !self.populate_one()? {
                trace!(
                    active = self.active.len(),
                    max_size = self.max_size,
                    "Pool exhausted"
                );
                return Ok(None);
            }
        }
    }

    /// Return a checked-out item.
    ///
    /// Items that are not active in this pool are ignored. At capacity the
    /// item is destroyed instead of requeued, which is how a pool sheds
    /// items created past its max size.
    pub fn release(&mut self, item: &T) -> Released {
        let Some(index) = self.active.iter().position(|active| active == item) else {
            trace!("Ignoring release of an item that is not active in this pool");
            return Released::Ignored;
        };

        let item = self.active.remove(index);
        self.lifecycle.release(&item);

        if self.count_all() >= self.max_size {
            let destroyed = self.lifecycle.destroy(item);
            debug!(
                count_all = self.count_all(),
                max_size = self.max_size,
                destroyed,
                "Discarded released item at capacity"
            );
            return Released::Discarded;
        }

        self.inactive.push_back(item);
        Released::Pooled
    }

    /// Destroy every item and empty the pool.
    ///
    /// Inactive items are destroyed first, in queue order, then active items
    /// in checkout order. `max_size` is left as is.
    pub fn clear(&mut self) {
        let inactive = self.inactive.len();
        let active = self.active.len();

        if self.lifecycle.has_destroy() {
            for item in self.inactive.drain(..) {
                self.lifecycle.destroy(item);
            }
            for item in self.active.drain(..) {
                self.lifecycle.destroy(item);
            }
        } else {
            self.inactive.clear();
            self.active.clear();
        }

        debug!(inactive, active, "Cleared object pool");
    }

    /// Add one inactive item, consulting the overflow policy at capacity.
    ///
    /// Returns `Ok(false)` if the policy refused.
    ///
    /// # Errors
    /// Returns [`Error::Create`](crate::Error::Create) if the create hook fails.
    pub fn populate_one(&mut self) -> Result<bool> {
        if self.count_all() >= self.max_size {
            match self
                .overflow_mode
                .resolve(self.max_size, self.size_increment, self.active.len())
            {
                OverflowAction::Refuse => return Ok(false),
                OverflowAction::Steal => {
                    let stolen = self.active.remove(0);
                    self.lifecycle.release(&stolen);
                    self.inactive.push_back(stolen);
                    debug!(
                        active = self.active.len(),
                        "Reclaimed oldest active item"
                    );
                    return Ok(true);
                }
                OverflowAction::Grow(max_size) => {
                    debug!(from = self.max_size, to = max_size, "Increasing pool size");
                    self.max_size = max_size;
                }
                OverflowAction::Exceed => {
                    debug!(
                        count_all = self.count_all(),
                        max_size = self.max_size,
                        "Creating item past max size"
                    );
                }
            }
        }

        let item = self.lifecycle.create()?;
        self.lifecycle.release(&item);
        self.inactive.push_back(item);
        Ok(true)
    }

    /// Add up to `count` inactive items, stopping at the first refusal.
    ///
    /// Returns the number of items added.
    ///
    /// # Errors
    /// Returns [`Error::Create`](crate::Error::Create) if the create hook
    /// fails; items added before the failure stay in the pool.
    pub fn populate_many(&mut self, count: usize) -> Result<usize> {
        let mut added = 0;
        while added < count && self.populate_one()? {
            added += 1;
        }
        Ok(added)
    }

    /// Record the current active count as a usage sample.
    ///
    /// Returns the sampled count, or `None` if tracking is disabled.
    pub fn sample_usage(&mut self) -> Option<usize> {
        let active = self.active.len();
        let usage = self.usage.as_mut()?;
        usage.record_sample(active);
        Some(active)
    }
}

impl<T, P> fmt::Debug for ObjectPool<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("active", &self.active.len())
            .field("inactive", &self.inactive.len())
            .field("max_size", &self.max_size)
            .field("overflow_mode", &self.overflow_mode)
            .field("size_increment", &self.size_increment)
            .field("lifecycle", &self.lifecycle)
            .field("usage", &self.usage)
            .finish()
    }
}

/// Lazy iterator returned by [`ObjectPool::get_many`].
pub struct GetMany<'a, T, P = ()> {
    pool: &'a mut ObjectPool<T, P>,
    remaining: usize,
}

impl<T, P> Iterator for GetMany<'_, T, P>
where
    T: Clone + PartialEq,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match self.pool.get() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.remaining = 0;
                None
            }
            Err(err) => {
                self.remaining = 0;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<T, P> FusedIterator for GetMany<'_, T, P> where T: Clone + PartialEq {}

impl<T, P> fmt::Debug for GetMany<'_, T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetMany")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}
