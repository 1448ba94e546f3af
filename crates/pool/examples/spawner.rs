//! A spawner firing short-lived projectiles from a managed pool.
//!
//! Run with `RUST_LOG=nebula_pool=debug cargo run -p nebula-pool --example spawner`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use nebula_pool::{Lifecycle, PoolBinding, PoolDescriptor, PoolManager, Poolable};
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

type Position = (f32, f32);

#[derive(Debug)]
struct ProjectileState {
    id: u64,
    live: AtomicBool,
    position: Mutex<Position>,
    binding: PoolBinding,
}

#[derive(Debug, Clone)]
struct Projectile(Arc<ProjectileState>);

impl PartialEq for Projectile {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Poolable for Projectile {
    fn binding(&self) -> &PoolBinding {
        &self.0.binding
    }
}

fn projectile_lifecycle() -> anyhow::Result<Lifecycle<Projectile, Position>> {
    let next_id = AtomicU64::new(0);
    let lifecycle = Lifecycle::builder()
        .on_create(move || {
            Ok(Projectile(Arc::new(ProjectileState {
                id: next_id.fetch_add(1, Ordering::Relaxed),
                live: AtomicBool::new(false),
                position: Mutex::new((0.0, 0.0)),
                binding: PoolBinding::new(),
            })))
        })
        .on_take(|projectile: &Projectile, at: Option<&Position>| {
            projectile.0.live.store(true, Ordering::Relaxed);
            if let Some(at) = at {
                *projectile.0.position.lock() = *at;
            }
        })
        .on_release(|projectile: &Projectile| {
            projectile.0.live.store(false, Ordering::Relaxed);
        })
        .on_destroy(|projectile: Projectile| {
            tracing::trace!(id = projectile.0.id, "Projectile destroyed");
        })
        .build()?;
    Ok(lifecycle)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let descriptor: PoolDescriptor = serde_json::from_str(
        r#"{
            "name": "projectiles",
            "pool": { "starting_count": 24, "max_size": 24, "overflow_mode": "StealFromActive" },
            "population": { "Incremental": { "batch_size": 4, "batch_interval": { "secs": 0, "nanos": 50000000 } } },
            "reporting": { "log_peak": true, "log_average": true, "sample_interval": { "secs": 0, "nanos": 100000000 } }
        }"#,
    )?;

    let manager = PoolManager::new();
    manager.register_bound(descriptor, projectile_lifecycle()?)?;

    // Each projectile lives for a fixed number of ticks.
    const LIFETIME_TICKS: u32 = 12;
    let mut in_flight: Vec<(Projectile, u32)> = Vec::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(20));

    for tick in 0..150u32 {
        ticker.tick().await;

        if tick % 2 == 0 {
            let at = (tick as f32, 0.0);
            if let Some(projectile) = manager.get_placed("projectiles", &at)? {
                in_flight.retain(|(flying, _)| flying != &projectile);
                in_flight.push((projectile, LIFETIME_TICKS));
            }
        }

        in_flight.retain_mut(|(projectile, ticks_left)| {
            *ticks_left -= 1;
            if *ticks_left == 0 {
                manager.release_bound(projectile);
                return false;
            }
            true
        });
    }

    info!(
        in_flight = in_flight.len(),
        pooled = ?manager.count_all("projectiles"),
        "Spawner finished"
    );

    for report in manager.shutdown().await {
        info!(pool = %report.name, usage = %report.usage, "Final usage");
    }
    Ok(())
}
