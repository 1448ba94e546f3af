//! Lifecycle callbacks a pool drives its items through.
//!
//! `create`, `take` and `release` are mandatory; `destroy` is optional. The
//! builder refuses to produce a [`Lifecycle`] with a mandatory hook missing,
//! so a misconfigured pool fails at construction rather than on first use.

use std::fmt;

use crate::error::{BoxError, Error, Result};

pub(crate) type CreateFn<T> = Box<dyn FnMut() -> std::result::Result<T, BoxError> + Send>;
pub(crate) type TakeFn<T, P> = Box<dyn FnMut(&T, Option<&P>) + Send>;
pub(crate) type ReleaseFn<T> = Box<dyn FnMut(&T) + Send>;
pub(crate) type DestroyFn<T> = Box<dyn FnMut(T) + Send>;

/// The set of hooks invoked on item transitions.
///
/// - `create` builds a new item (failures propagate to the caller of
///   `get`/population).
/// - `take` runs when an item becomes active, with optional placement params.
/// - `release` runs when an item becomes inactive, including when it is
///   created, stolen or released at capacity.
/// - `destroy` runs exactly once when an item is permanently removed.
pub struct Lifecycle<T, P = ()> {
    create: CreateFn<T>,
    take: TakeFn<T, P>,
    release: ReleaseFn<T>,
    destroy: Option<DestroyFn<T>>,
}

impl<T, P> Lifecycle<T, P> {
    /// Start building a lifecycle.
    #[must_use]
    pub fn builder() -> LifecycleBuilder<T, P> {
        LifecycleBuilder::default()
    }

    /// Whether a destroy hook was supplied.
    #[must_use]
    pub fn has_destroy(&self) -> bool {
        self.destroy.is_some()
    }

    pub(crate) fn create(&mut self) -> Result<T> {
        (self.create)().map_err(Error::create)
    }

    pub(crate) fn take(&mut self, item: &T, placement: Option<&P>) {
        (self.take)(item, placement);
    }

    pub(crate) fn release(&mut self, item: &T) {
        (self.release)(item);
    }

    /// Returns `false` when no destroy hook is present.
    pub(crate) fn destroy(&mut self, item: T) -> bool {
        match self.destroy.as_mut() {
            Some(destroy) => {
                destroy(item);
                true
            }
            None => false,
        }
    }

    /// Wrap the create hook, e.g. to stamp every new item.
    pub(crate) fn map_create<F>(self, mut wrap: F) -> Self
    where
        T: 'static,
        F: FnMut(T) -> std::result::Result<T, BoxError> + Send + 'static,
    {
        let mut create = self.create;
        Self {
            create: Box::new(move || create().and_then(&mut wrap)),
            take: self.take,
            release: self.release,
            destroy: self.destroy,
        }
    }
}

impl<T, P> fmt::Debug for Lifecycle<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("destroy", &self.destroy.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Lifecycle`].
pub struct LifecycleBuilder<T, P = ()> {
    create: Option<CreateFn<T>>,
    take: Option<TakeFn<T, P>>,
    release: Option<ReleaseFn<T>>,
    destroy: Option<DestroyFn<T>>,
}

impl<T, P> Default for LifecycleBuilder<T, P> {
    fn default() -> Self {
        Self {
            create: None,
            take: None,
            release: None,
            destroy: None,
        }
    }
}

impl<T, P> LifecycleBuilder<T, P> {
    /// Set the create hook.
    pub fn on_create<F>(mut self, create: F) -> Self
    where
        F: FnMut() -> std::result::Result<T, BoxError> + Send + 'static,
    {
        self.create = Some(Box::new(create));
        self
    }

    /// Set the take hook.
    pub fn on_take<F>(mut self, take: F) -> Self
    where
        F: FnMut(&T, Option<&P>) + Send + 'static,
    {
        self.take = Some(Box::new(take));
        self
    }

    /// Set the release hook.
    pub fn on_release<F>(mut self, release: F) -> Self
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    /// Set the optional destroy hook.
    pub fn on_destroy<F>(mut self, destroy: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        self.destroy = Some(Box::new(destroy));
        self
    }

    /// Finish the lifecycle.
    ///
    /// # Errors
    /// Returns [`Error::MissingCallback`] if `create`, `take` or `release`
    /// was not set.
    pub fn build(self) -> Result<Lifecycle<T, P>> {
        let create = self
            .create
            .ok_or(Error::MissingCallback { callback: "create" })?;
        let take = self.take.ok_or(Error::MissingCallback { callback: "take" })?;
        let release = self
            .release
            .ok_or(Error::MissingCallback { callback: "release" })?;
        Ok(Lifecycle {
            create,
            take,
            release,
            destroy: self.destroy,
        })
    }
}

impl<T, P> fmt::Debug for LifecycleBuilder<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleBuilder")
            .field("create", &self.create.is_some())
            .field("take", &self.take.is_some())
            .field("release", &self.release.is_some())
            .field("destroy", &self.destroy.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn complete() -> LifecycleBuilder<u32> {
        Lifecycle::builder()
            .on_create(|| Ok(7))
            .on_take(|_, _| {})
            .on_release(|_| {})
    }

    #[test]
    fn builds_without_destroy() {
        let lifecycle = complete().build().unwrap();
        assert!(!lifecycle.has_destroy());
    }

    #[test]
    fn missing_create_is_rejected() {
        let err = Lifecycle::<u32>::builder()
            .on_take(|_, _| {})
            .on_release(|_| {})
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingCallback { callback: "create" }));
    }

    #[test]
    fn missing_take_is_rejected() {
        let err = Lifecycle::<u32>::builder()
            .on_create(|| Ok(1))
            .on_release(|_| {})
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingCallback { callback: "take" }));
    }

    #[test]
    fn missing_release_is_rejected() {
        let err = Lifecycle::<u32>::builder()
            .on_create(|| Ok(1))
            .on_take(|_, _| {})
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingCallback { callback: "release" }));
    }

    #[test]
    fn destroy_reports_presence() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);
        let mut lifecycle = complete()
            .on_destroy(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        assert!(lifecycle.destroy(3));
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);

        let mut bare = complete().build().unwrap();
        assert!(!bare.destroy(3));
    }

    #[test]
    fn create_failure_is_wrapped() {
        let mut lifecycle = Lifecycle::<u32>::builder()
            .on_create(|| Err("no prefab".into()))
            .on_take(|_, _| {})
            .on_release(|_| {})
            .build()
            .unwrap();
        assert!(matches!(lifecycle.create(), Err(Error::Create { .. })));
    }

    #[test]
    fn map_create_wraps_every_item() {
        let mut lifecycle = complete().build().unwrap().map_create(|n| Ok(n * 2));
        assert_eq!(lifecycle.create().unwrap(), 14);
    }
}
