use crate::engine::traffic_network::{plan_route, TrafficNetwork};
use crate::error::{NetworkError, Result};
use crate::shared_data::RouteUpdate;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task;

/// Handle for sharing one `TrafficNetwork` between concurrent callers.
///
/// The store, the counters and the signal state form a single consistency
/// domain behind one lock: writers are exclusive, and a reader never sees
/// half of a bidirectional update.
#[derive(Clone)]
pub struct SharedNetwork {
    inner: Arc<RwLock<TrafficNetwork>>,
}

impl SharedNetwork {
    pub fn new(network: TrafficNetwork) -> Self {
        Self {
            inner: Arc::new(RwLock::new(network)),
        }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, TrafficNetwork>> {
        self.inner.read().map_err(|_| poisoned())
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, TrafficNetwork>> {
        self.inner.write().map_err(|_| poisoned())
    }

    pub fn with_read<T>(&self, f: impl FnOnce(&TrafficNetwork) -> T) -> Result<T> {
        let guard = self.read()?;
        Ok(f(&guard))
    }

    pub fn with_write<T>(&self, f: impl FnOnce(&mut TrafficNetwork) -> Result<T>) -> Result<T> {
        let mut guard = self.write()?;
        f(&mut guard)
    }

    /// Recalculates every vehicle's route in parallel.
    ///
    /// Routes are planned on blocking workers against a snapshot of the road
    /// store taken under the read lock. They are installed under the write
    /// lock only if the store is still at the snapshot's revision; otherwise
    /// the batch is redone under the write lock.
    pub async fn recalculate_all_routes(&self) -> Result<Vec<RouteUpdate>> {
        let (snapshot, vehicles, revision) = self.with_read(|network| {
            (
                Arc::new(network.roads().clone()),
                network.vehicle_endpoints(),
                network.revision(),
            )
        })?;

        let handles: Vec<_> = vehicles
            .into_iter()
            .map(|vehicle| {
                let snapshot = Arc::clone(&snapshot);
                task::spawn_blocking(move || (vehicle.id, plan_route(snapshot.as_ref(), &vehicle)))
            })
            .collect();

        let mut planned = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle.await.map_err(|err| {
                NetworkError::InternalInconsistency(format!("route worker failed: {}", err))
            })?;
            planned.push(result);
        }

        let mut network = self.write()?;
        if network.revision() != revision {
            log::info!(
                "Road network changed during batch recalculation (revision {} -> {}), recomputing",
                revision,
                network.revision()
            );
            return network.recalculate_all_routes();
        }

        let mut updates = Vec::with_capacity(planned.len());
        for (vehicle_id, path) in planned {
            let outcome = network.install_route(vehicle_id, path)?;
            updates.push(RouteUpdate { vehicle_id, outcome });
        }
        Ok(updates)
    }
}

fn poisoned() -> NetworkError {
    NetworkError::InternalInconsistency("network lock poisoned".to_string())
}
