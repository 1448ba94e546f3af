//! Owner binding for pooled items.
//!
//! An item that knows which pool it came from can be returned without the
//! caller tracking the pool name. The owner is set once, when the managed
//! pool creates the item.

use std::fmt;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Write-once reference from an item to its owning pool.
pub struct PoolBinding<K = String> {
    owner: OnceLock<K>,
}

impl<K> PoolBinding<K> {
    /// An unbound binding.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            owner: OnceLock::new(),
        }
    }

    /// The owning pool, if bound.
    pub fn owner(&self) -> Option<&K> {
        self.owner.get()
    }

    /// Whether the owner has been set.
    pub fn is_bound(&self) -> bool {
        self.owner.get().is_some()
    }
}

impl<K: fmt::Display> PoolBinding<K> {
    /// Bind to `owner`.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyBound`] naming the existing owner if the item
    /// was bound before; the binding is left unchanged.
    pub fn bind(&self, owner: K) -> Result<()> {
        self.owner.set(owner).map_err(|_| Error::AlreadyBound {
            owner: self
                .owner
                .get()
                .map(ToString::to_string)
                .unwrap_or_default(),
        })
    }
}

impl<K> Default for PoolBinding<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug> fmt::Debug for PoolBinding<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBinding")
            .field("owner", &self.owner.get())
            .finish()
    }
}

/// An item that carries its owning pool's name.
///
/// Implement this on the shared state behind a pooled handle so every clone
/// sees the same binding.
pub trait Poolable {
    /// The item's binding.
    fn binding(&self) -> &PoolBinding;

    /// Name of the owning pool, if bound.
    fn owner(&self) -> Option<&str> {
        self.binding().owner().map(String::as_str)
    }
}
