//! # Nebula Object Pooling
//!
//! Recycling pools for expensive-to-create items. A pool keeps checked-out
//! items in an active set and returned ones in an inactive queue, and drives
//! every transition through caller-supplied [`Lifecycle`] hooks.
//!
//! When a full pool is asked for one more item its [`OverflowMode`] decides
//! what happens: reclaim the oldest active item, refuse, create past the
//! limit, or grow. A [`PoolManager`] keeps named pools, fills them in bulk or
//! in batches on a background task, and reports their peak and average usage
//! at shutdown.
//!
//! ```
//! use nebula_pool::{Lifecycle, ObjectPool, OverflowMode, PoolConfig, Released};
//!
//! let lifecycle = Lifecycle::<String>::builder()
//!     .on_create(|| Ok(String::with_capacity(64)))
//!     .on_take(|_, _| {})
//!     .on_release(|_| {})
//!     .build()?;
//!
//! let config = PoolConfig::new(1, OverflowMode::HardLimit).with_starting_count(1);
//! let mut pool = ObjectPool::new(config, lifecycle)?;
//!
//! let buffer = pool.try_get()?.expect("prefilled");
//! assert!(pool.try_get()?.is_none());
//! assert_eq!(pool.release(&buffer), Released::Pooled);
//! # Ok::<(), nebula_pool::Error>(())
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod overflow;
pub mod pool;
pub mod populate;
pub mod usage;

pub use binding::{PoolBinding, Poolable};
pub use config::{
    DEFAULT_SAMPLE_CAPACITY, DEFAULT_SAMPLE_INTERVAL, DEFAULT_SIZE_INCREMENT,
    DEFAULT_STARTING_COUNT, PoolConfig, PoolDescriptor, PopulationMode, UsageReporting,
};
pub use error::{BoxError, Error, Result};
pub use lifecycle::{Lifecycle, LifecycleBuilder};
pub use manager::{PoolManager, PoolReport};
pub use overflow::OverflowMode;
pub use pool::{GetMany, ObjectPool, Released, SharedPool};
pub use populate::{
    IncrementalPopulation, PopulationOutcome, PopulationStep, run_incremental, spawn_incremental,
};
pub use usage::{UsageReport, UsageSampler, UsageStats};
