use crate::client::CoreLedgerClient;
use crate::worker::IndexerWorker;
use alloy_primitives::Address;
use bridge_config::Tunables;
use bridge_metrics::IndexerMetrics;
use bridge_storage::Storage;
use bridge_tasks::{BackoffCoordinator, CancellationToken, TaskManager};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Every running per-address worker's own cancellation branch plus its
/// join handle, so the controller can stop exactly one worker without
/// tearing down the rest.
struct RunningWorker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Reconciles the live set of indexer workers against the durable
/// `WatchedAddress` set (spec §4.G): starts a worker per newly-active
/// address, stops workers for removed or deactivated ones, every
/// `controller_reconcile_interval`.
pub struct IndexerFleet {
    storage: Arc<dyn Storage>,
    client: CoreLedgerClient,
    backoff: BackoffCoordinator,
    metrics: IndexerMetrics,
    tunables: Tunables,
    workers: Mutex<HashMap<Address, RunningWorker>>,
}

impl std::fmt::Debug for IndexerFleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexerFleet").field("storage", &self.storage).finish_non_exhaustive()
    }
}

impl IndexerFleet {
    pub fn new(
        storage: Arc<dyn Storage>,
        client: CoreLedgerClient,
        backoff: BackoffCoordinator,
        metrics: IndexerMetrics,
        tunables: Tunables,
    ) -> Arc<Self> {
        Arc::new(Self { storage, client, backoff, metrics, tunables, workers: Mutex::new(HashMap::new()) })
    }

    /// Register the controller loop on `task_manager`. Per-address workers
    /// are spawned directly off the runtime (not tracked by `task_manager`,
    /// since their lifetime is dynamic), but each holds a child of the
    /// token passed here, so cancelling the root scope still cancels every
    /// one of them; the controller also explicitly joins them all on
    /// shutdown before returning.
    pub fn spawn(self: &Arc<Self>, task_manager: &mut TaskManager) {
        let fleet = Arc::clone(self);
        let token = task_manager.token();
        task_manager.spawn(async move { fleet.run_controller(token).await });
    }

    async fn run_controller(&self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.tunables.controller_reconcile_interval);
        loop {
            tokio::select! {
                () = token.cancelled() => {
                    self.shutdown_all().await;
                    return;
                }
                _ = interval.tick() => {
                    self.reconcile(&token).await;
                }
            }
        }
    }

    pub(crate) async fn reconcile(&self, parent_token: &CancellationToken) {
        let watched = match self.storage.get_watched_addresses().await {
            Ok(watched) => watched,
            Err(error) => {
                tracing::warn!(target: "indexer", %error, "failed to read watched addresses");
                return;
            }
        };
        let desired: HashMap<Address, u64> =
            watched.into_iter().filter(|w| w.is_active).map(|w| (w.address, w.last_indexed_time)).collect();

        let mut workers = self.workers.lock().await;

        let stale: Vec<Address> = workers.keys().filter(|addr| !desired.contains_key(addr)).copied().collect();
        for address in stale {
            if let Some(worker) = workers.remove(&address) {
                tracing::info!(target: "indexer", %address, "stopping indexer worker for deactivated address");
                worker.token.cancel();
                if let Err(error) = worker.handle.await {
                    if error.is_panic() {
                        tracing::error!(target: "indexer", %address, %error, "indexer worker panicked");
                    }
                }
                self.metrics.active_workers.decrement(1.0);
            }
        }

        for (address, cursor) in desired {
            if workers.contains_key(&address) {
                continue;
            }
            tracing::info!(target: "indexer", %address, cursor, "starting indexer worker");
            let child_token = parent_token.child_token();
            let worker = IndexerWorker::new(
                address,
                self.client.clone(),
                Arc::clone(&self.storage),
                self.backoff.clone(),
                self.metrics.clone(),
                self.tunables,
            );
            let run_token = child_token.clone();
            let handle = tokio::spawn(async move { worker.run(cursor, run_token).await });
            workers.insert(address, RunningWorker { token: child_token, handle });
            self.metrics.active_workers.increment(1.0);
        }
    }

    async fn shutdown_all(&self) {
        let mut workers = self.workers.lock().await;
        for (address, worker) in workers.drain() {
            worker.token.cancel();
            if let Err(error) = worker.handle.await {
                if error.is_panic() {
                    tracing::error!(target: "indexer", %address, %error, "indexer worker panicked during shutdown");
                }
            }
            self.metrics.active_workers.decrement(1.0);
        }
    }

    /// Number of currently-running per-address workers. Test-only.
    #[cfg(test)]
    pub(crate) async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }
}
