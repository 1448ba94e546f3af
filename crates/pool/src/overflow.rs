//! Overflow policy: what a full pool does when one more free slot is needed.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What to do when the pool is at capacity but another item is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OverflowMode {
    /// Reclaim the oldest checked-out item and hand it out again.
    ///
    /// The caller that held the reclaimed item must treat it as returned.
    #[default]
    StealFromActive,
    /// Refuse; the request yields nothing.
    HardLimit,
    /// Create items past `max_size` without raising it.
    ///
    /// Surplus items are destroyed when released instead of being pooled.
    AllowOverflow,
    /// Raise `max_size` by the pool's size increment, then create.
    IncreaseSize,
}

impl fmt::Display for OverflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StealFromActive => write!(f, "steal-from-active"),
            Self::HardLimit => write!(f, "hard-limit"),
            Self::AllowOverflow => write!(f, "allow-overflow"),
            Self::IncreaseSize => write!(f, "increase-size"),
        }
    }
}

/// Decision taken for a single overflowing population request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OverflowAction {
    /// No slot can be produced.
    Refuse,
    /// Move the oldest active item back to inactive.
    Steal,
    /// Raise the max size to the contained value, then create.
    Grow(usize),
    /// Create past the max size.
    Exceed,
}

impl OverflowMode {
    /// Resolve the action for a pool whose `count_all >= max_size`.
    pub(crate) fn resolve(
        self,
        max_size: usize,
        size_increment: usize,
        active: usize,
    ) -> OverflowAction {
        match self {
            Self::HardLimit => OverflowAction::Refuse,
            Self::StealFromActive if active == 0 => OverflowAction::Refuse,
            Self::StealFromActive => OverflowAction::Steal,
            Self::IncreaseSize => OverflowAction::Grow(max_size.saturating_add(size_increment)),
            Self::AllowOverflow => OverflowAction::Exceed,
        }
    }

    /// Whether this mode can ever refuse a request.
    #[must_use]
    pub fn can_refuse(self) -> bool {
        matches!(self, Self::HardLimit | Self::StealFromActive)
    }
}
