//! Incremental population: fill a pool in fixed-size batches, yielding to
//! the scheduler between batches so a large prefill does not monopolise it.

use std::fmt;
use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::pool::ObjectPool;

/// Result of one [`IncrementalPopulation::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationStep {
    /// This many items were added.
    Batch(usize),
    /// The target was reached.
    Complete,
    /// The pool refused every item in the batch; the task will not progress.
    Stalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Running,
    Complete,
    Stalled,
}

/// Resumable task that adds `total` inactive items, `batch_size` at a time.
#[derive(Debug, Clone)]
pub struct IncrementalPopulation {
    total: usize,
    batch_size: usize,
    populated: usize,
    state: TaskState,
}

impl IncrementalPopulation {
    /// Create a task.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `batch_size` is zero.
    pub fn new(total: usize, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::configuration("batch_size must be at least 1"));
        }
        Ok(Self {
            total,
            batch_size,
            populated: 0,
            state: TaskState::Running,
        })
    }

    /// Target item count.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Items per batch.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Items added so far.
    #[must_use]
    pub fn populated(&self) -> usize {
        self.populated
    }

    /// Items still to add.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.populated)
    }

    /// Whether further steps are no-ops.
    ///
    /// True as soon as the batch that reaches the target has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state != TaskState::Running
    }

    /// Run one batch against `pool`.
    ///
    /// Once the task reports `Complete` or `Stalled` (or fails), every later
    /// step returns the same terminal value without touching the pool; a
    /// failed task reports `Stalled`.
    ///
    /// # Errors
    /// Returns [`Error::Create`] if the create hook fails. Items added before
    /// the failure count toward [`populated`](Self::populated).
    pub fn step<T, P>(&mut self, pool: &mut ObjectPool<T, P>) -> Result<PopulationStep>
    where
        T: Clone + PartialEq,
    {
        match self.state {
            TaskState::Complete => return Ok(PopulationStep::Complete),
            TaskState::Stalled => return Ok(PopulationStep::Stalled),
            TaskState::Running => {}
        }

        if self.populated >= self.total {
            self.state = TaskState::Complete;
            return Ok(PopulationStep::Complete);
        }

        let batch = self.batch_size.min(self.remaining());
        let mut added = 0;
        while added < batch {
            match pool.populate_one() {
                Ok(true) => added += 1,
                Ok(false) => break,
                Err(err) => {
                    self.populated += added;
                    self.state = TaskState::Stalled;
                    return Err(err);
                }
            }
        }

        if added == 0 {
            self.state = TaskState::Stalled;
            return Ok(PopulationStep::Stalled);
        }
        self.populated += added;
        if self.populated >= self.total {
            self.state = TaskState::Complete;
        }
        Ok(PopulationStep::Batch(added))
    }
}

/// How a background population task ended.
#[derive(Debug)]
pub enum PopulationOutcome {
    /// All requested items were added.
    Completed {
        /// Items added
        populated: usize,
    },
    /// The pool refused further items before the target was reached.
    Stalled {
        /// Items added
        populated: usize,
        /// Requested item count
        total: usize,
    },
    /// The token was cancelled or the pool was dropped.
    Cancelled {
        /// Items added before stopping
        populated: usize,
    },
    /// The create hook failed.
    Failed {
        /// Items added before the failure
        populated: usize,
        /// The create failure
        error: Error,
    },
}

impl PopulationOutcome {
    /// Items added before the task ended.
    #[must_use]
    pub fn populated(&self) -> usize {
        match self {
            Self::Completed { populated }
            | Self::Stalled { populated, .. }
            | Self::Cancelled { populated }
            | Self::Failed { populated, .. } => *populated,
        }
    }

    /// Whether the task reached its target.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

impl fmt::Display for PopulationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { populated } => write!(f, "completed with {populated} items"),
            Self::Stalled { populated, total } => {
                write!(f, "stalled at {populated} of {total} items")
            }
            Self::Cancelled { populated } => write!(f, "cancelled after {populated} items"),
            Self::Failed { populated, error } => {
                write!(f, "failed after {populated} items: {error}")
            }
        }
    }
}

/// Spawn `task` against `pool` on the current Tokio runtime.
///
/// Between batches the task sleeps for `batch_interval`, or yields once when
/// it is zero. It checks `cancel` and the pool's liveness before every batch.
pub fn spawn_incremental<T, P>(
    pool: Weak<Mutex<ObjectPool<T, P>>>,
    task: IncrementalPopulation,
    batch_interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<PopulationOutcome>
where
    T: Clone + PartialEq + Send + 'static,
    P: 'static,
{
    tokio::spawn(run_incremental(pool, task, batch_interval, cancel))
}

/// Drive `task` to completion; see [`spawn_incremental`].
pub async fn run_incremental<T, P>(
    pool: Weak<Mutex<ObjectPool<T, P>>>,
    mut task: IncrementalPopulation,
    batch_interval: Duration,
    cancel: CancellationToken,
) -> PopulationOutcome
where
    T: Clone + PartialEq,
{
    loop {
        if cancel.is_cancelled() {
            debug!(populated = task.populated(), "Population cancelled");
            return PopulationOutcome::Cancelled {
                populated: task.populated(),
            };
        }

        let step = match pool.upgrade() {
            Some(shared) => {
                let mut guard = shared.lock();
                task.step(&mut *guard)
            }
            None => {
                debug!(populated = task.populated(), "Pool dropped, stopping population");
                return PopulationOutcome::Cancelled {
                    populated: task.populated(),
                };
            }
        };

        match step {
            Ok(PopulationStep::Batch(added)) => {
                trace!(
                    added,
                    populated = task.populated(),
                    total = task.total(),
                    "Populated batch"
                );
                if task.is_finished() {
                    debug!(populated = task.populated(), "Population complete");
                    return PopulationOutcome::Completed {
                        populated: task.populated(),
                    };
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!(populated = task.populated(), "Population cancelled");
                        return PopulationOutcome::Cancelled {
                            populated: task.populated(),
                        };
                    }
                    () = pause(batch_interval) => {}
                }
            }
            Ok(PopulationStep::Complete) => {
                debug!(populated = task.populated(), "Population complete");
                return PopulationOutcome::Completed {
                    populated: task.populated(),
                };
            }
            Ok(PopulationStep::Stalled) => {
                warn!(
                    populated = task.populated(),
                    total = task.total(),
                    "Population stalled, pool refused further items"
                );
                return PopulationOutcome::Stalled {
                    populated: task.populated(),
                    total: task.total(),
                };
            }
            Err(error) => {
                warn!(
                    populated = task.populated(),
                    %error,
                    "Population failed"
                );
                return PopulationOutcome::Failed {
                    populated: task.populated(),
                    error,
                };
            }
        }
    }
}

async fn pause(interval: Duration) {
    if interval.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(interval).await;
    }
}
