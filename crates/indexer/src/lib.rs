//! The indexer fleet (spec §4.G): one worker per watched address, each
//! polling the CORE ledger with a locally-held cursor, filtering to
//! outgoing spot transfers whose destination is a system address, and
//! batch-inserting them as `PENDING` work for the matcher pool. A
//! controller task reconciles the live worker set against the durable
//! `WatchedAddress` configuration every `controller_reconcile_interval`.

mod client;
mod controller;
mod worker;

pub use client::CoreLedgerClient;
pub use controller::IndexerFleet;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, Address};
    use bridge_config::Tunables;
    use bridge_metrics::IndexerMetrics;
    use bridge_primitives::WatchedAddress;
    use bridge_storage::{FakeStorage, Storage};
    use bridge_tasks::{BackoffCoordinator, TaskManager};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_fleet(storage: Arc<dyn Storage>) -> Arc<IndexerFleet> {
        let client = CoreLedgerClient::new(reqwest::Client::new(), "http://localhost".to_owned());
        let mut tunables = Tunables::default();
        tunables.controller_reconcile_interval = Duration::from_millis(10);
        IndexerFleet::new(storage, client, BackoffCoordinator::new(), IndexerMetrics::default(), tunables)
    }

    #[tokio::test]
    async fn reconcile_starts_a_worker_for_a_newly_watched_address() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        let addr: Address = address!("000000000000000000000000000000000000aa");
        storage.upsert_watched_address(WatchedAddress::new(addr)).await.unwrap();

        let fleet = test_fleet(storage);
        let mut manager = TaskManager::new();
        let token = manager.token();

        fleet.reconcile(&token).await;
        assert_eq!(fleet.worker_count().await, 1);

        manager.shutdown();
        manager.join_all().await;
    }

    #[tokio::test]
    async fn reconcile_stops_a_worker_for_a_deactivated_address() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        let addr: Address = address!("000000000000000000000000000000000000aa");
        storage.upsert_watched_address(WatchedAddress::new(addr)).await.unwrap();

        let fleet = test_fleet(storage.clone());
        let mut manager = TaskManager::new();
        let token = manager.token();

        fleet.reconcile(&token).await;
        assert_eq!(fleet.worker_count().await, 1);

        storage.update_is_active(addr, false);
        fleet.reconcile(&token).await;
        assert_eq!(fleet.worker_count().await, 0);

        manager.shutdown();
        manager.join_all().await;
    }

    #[tokio::test]
    async fn reconcile_is_idempotent_for_an_unchanged_watched_set() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        let addr: Address = address!("000000000000000000000000000000000000aa");
        storage.upsert_watched_address(WatchedAddress::new(addr)).await.unwrap();

        let fleet = test_fleet(storage);
        let mut manager = TaskManager::new();
        let token = manager.token();

        fleet.reconcile(&token).await;
        fleet.reconcile(&token).await;
        assert_eq!(fleet.worker_count().await, 1, "a repeat reconcile must not spawn a second worker");

        manager.shutdown();
        manager.join_all().await;
    }
}
