//! Shared test entity and lifecycle probe for nebula-pool integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use nebula_pool::{Lifecycle, ObjectPool, OverflowMode, PoolBinding, PoolConfig, Poolable};
use parking_lot::Mutex;

/// Placement params forwarded to the take hook.
pub type Placement = (i32, i32);

#[derive(Debug)]
pub struct EntityState {
    pub id: usize,
    pub enabled: AtomicBool,
    pub destroyed: AtomicBool,
    pub placed_at: Mutex<Option<Placement>>,
    pub binding: PoolBinding,
}

/// Handle to a pooled entity; equality is identity.
#[derive(Debug, Clone)]
pub struct Entity(pub Arc<EntityState>);

impl Entity {
    pub fn new(id: usize) -> Self {
        Self(Arc::new(EntityState {
            id,
            enabled: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            placed_at: Mutex::new(None),
            binding: PoolBinding::new(),
        }))
    }

    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn is_enabled(&self) -> bool {
        self.0.enabled.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.load(Ordering::SeqCst)
    }

    pub fn placed_at(&self) -> Option<Placement> {
        *self.0.placed_at.lock()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Poolable for Entity {
    fn binding(&self) -> &PoolBinding {
        &self.0.binding
    }
}

/// Counts hook invocations and controls create failures.
#[derive(Debug, Default)]
pub struct Probe {
    pub created: AtomicUsize,
    pub taken: AtomicUsize,
    pub released: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub fail_create: AtomicBool,
    pub destroy_order: Mutex<Vec<usize>>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn taken(&self) -> usize {
        self.taken.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn destroy_order(&self) -> Vec<usize> {
        self.destroy_order.lock().clone()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Lifecycle with all four hooks.
    pub fn lifecycle(self: &Arc<Self>) -> Lifecycle<Entity, Placement> {
        let destroy_probe = Arc::clone(self);
        self.lifecycle_builder()
            .on_destroy(move |entity: Entity| {
                entity.0.destroyed.store(true, Ordering::SeqCst);
                destroy_probe.destroy_order.lock().push(entity.id());
                destroy_probe.destroyed.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap()
    }

    /// Lifecycle without a destroy hook.
    pub fn lifecycle_without_destroy(self: &Arc<Self>) -> Lifecycle<Entity, Placement> {
        self.lifecycle_builder().build().unwrap()
    }

    fn lifecycle_builder(self: &Arc<Self>) -> nebula_pool::LifecycleBuilder<Entity, Placement> {
        let create_probe = Arc::clone(self);
        let take_probe = Arc::clone(self);
        let release_probe = Arc::clone(self);
        Lifecycle::builder()
            .on_create(move || {
                if create_probe.fail_create.load(Ordering::SeqCst) {
                    return Err("create disabled".into());
                }
                Ok(Entity::new(create_probe.created.fetch_add(1, Ordering::SeqCst)))
            })
            .on_take(move |entity: &Entity, placement: Option<&Placement>| {
                entity.0.enabled.store(true, Ordering::SeqCst);
                if let Some(placement) = placement {
                    *entity.0.placed_at.lock() = Some(*placement);
                }
                take_probe.taken.fetch_add(1, Ordering::SeqCst);
            })
            .on_release(move |entity: &Entity| {
                entity.0.enabled.store(false, Ordering::SeqCst);
                release_probe.released.fetch_add(1, Ordering::SeqCst);
            })
    }
}

/// A pool of `max_size` entities with no prefill.
pub fn pool(
    max_size: usize,
    overflow_mode: OverflowMode,
) -> (ObjectPool<Entity, Placement>, Arc<Probe>) {
    pool_with(PoolConfig::new(max_size, overflow_mode))
}

pub fn pool_with(config: PoolConfig) -> (ObjectPool<Entity, Placement>, Arc<Probe>) {
    let probe = Probe::new();
    let pool = ObjectPool::new(config, probe.lifecycle()).unwrap();
    (pool, probe)
}
