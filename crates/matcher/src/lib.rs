//! Bounded producer/consumer pool that drains `PENDING` transfers through
//! the finder (spec §4.F). A single producer refills a bounded channel from
//! storage, picking between an RPC and an object-store fetch strategy based
//! on how far behind the pending queue has fallen; a fixed pool of
//! consumers drains it concurrently, each resolving one transfer at a time
//! under a per-transfer deadline.

mod consumer;
mod dedup;
mod producer;

use arc_swap::ArcSwap;
use bridge_anchor_index::AnchorIndex;
use bridge_assets::AssetCache;
use bridge_config::Tunables;
use bridge_evm_fetch::BlockFetcher;
use bridge_finder::Finder;
use bridge_metrics::MatcherMetrics;
use bridge_primitives::Transfer;
use bridge_storage::Storage;
use bridge_tasks::{CancellationToken, TaskManager};
use dedup::DedupSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Owns the pending-transfer queue and every task that reads or writes it.
/// Constructed once at startup and handed to [`MatcherPool::spawn`], which
/// registers the producer, the consumer pool, and a periodic stats logger
/// on a [`TaskManager`].
pub struct MatcherPool {
    storage: Arc<dyn Storage>,
    anchor_index: AnchorIndex,
    assets: Arc<AssetCache>,
    finder: Finder,
    rpc_fetcher: Arc<dyn BlockFetcher>,
    object_store_fetcher: Arc<dyn BlockFetcher>,
    active_fetcher: ArcSwap<dyn BlockFetcher>,
    dedup: DedupSet,
    sender: mpsc::Sender<Transfer>,
    receiver: Mutex<mpsc::Receiver<Transfer>>,
    metrics: MatcherMetrics,
    tunables: Tunables,
}

impl std::fmt::Debug for MatcherPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherPool")
            .field("queue_depth", &self.queue_depth())
            .field("dedup_set_size", &self.dedup.len())
            .field("active_fetcher", &self.active_fetcher.load().name())
            .finish()
    }
}

impl MatcherPool {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Arc<dyn Storage>,
        anchor_index: AnchorIndex,
        assets: Arc<AssetCache>,
        finder: Finder,
        rpc_fetcher: Arc<dyn BlockFetcher>,
        object_store_fetcher: Arc<dyn BlockFetcher>,
        metrics: MatcherMetrics,
        tunables: Tunables,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(tunables.queue_capacity);
        let active_fetcher = ArcSwap::from(Arc::clone(&rpc_fetcher));
        let dedup = DedupSet::new(tunables.dedup_set_max, tunables.dedup_set_retain);
        Arc::new(Self {
            storage,
            anchor_index,
            assets,
            finder,
            rpc_fetcher,
            object_store_fetcher,
            active_fetcher,
            dedup,
            sender,
            receiver: Mutex::new(receiver),
            metrics,
            tunables,
        })
    }

    /// Register the producer, `evm_matcher_concurrency` consumers, and a
    /// stats logger on `task_manager`. Every task holds its own clone of the
    /// manager's cancellation token and winds down when it fires.
    pub fn spawn(self: &Arc<Self>, task_manager: &mut TaskManager) {
        let pool = Arc::clone(self);
        let token = task_manager.token();
        task_manager.spawn(async move { pool.run_producer(token).await });

        for _ in 0..self.tunables.evm_matcher_concurrency {
            let pool = Arc::clone(self);
            let token = task_manager.token();
            task_manager.spawn(async move { pool.run_consumer(token).await });
        }

        let pool = Arc::clone(self);
        let token = task_manager.token();
        task_manager.spawn(async move { pool.run_stats_logger(token).await });
    }

    async fn run_stats_logger(&self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.tunables.stats_log_interval);
        loop {
            tokio::select! {
                () = token.cancelled() => return,
                _ = interval.tick() => {
                    tracing::info!(
                        target: "matcher",
                        queue_depth = self.queue_depth(),
                        dedup_set_size = self.dedup.len(),
                        active_fetcher = self.active_fetcher.load().name(),
                        "matcher pool stats"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, Address};
    use async_trait::async_trait;
    use bridge_errors::FetchError;
    use bridge_primitives::{native_system_address, BlockAnchor, BlockData};
    use bridge_storage::FakeStorage;

    #[derive(Debug)]
    struct StubFetcher {
        name: &'static str,
        blocks: Vec<BlockData>,
    }

    #[async_trait]
    impl BlockFetcher for StubFetcher {
        async fn fetch_blocks(&self, block_numbers: &[u64]) -> Result<Vec<BlockData>, FetchError> {
            Ok(self.blocks.iter().filter(|b| block_numbers.contains(&b.number)).cloned().collect())
        }
        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[derive(Debug)]
    struct ErrFetcher;

    #[async_trait]
    impl BlockFetcher for ErrFetcher {
        async fn fetch_blocks(&self, _block_numbers: &[u64]) -> Result<Vec<BlockData>, FetchError> {
            Err(FetchError::Transient("simulated outage".to_owned()))
        }
        fn name(&self) -> &'static str {
            "err"
        }
    }

    fn sample_transfer(core_hash: &str, core_time: u64) -> Transfer {
        Transfer::new_pending(
            core_hash.to_owned(),
            core_time,
            "native".to_owned(),
            "1.0".to_owned(),
            address!("000000000000000000000000000000000000aa"),
            native_system_address(),
            Address::ZERO,
            None,
            None,
            None,
        )
    }

    fn build_pool(storage: Arc<dyn Storage>, rpc: Arc<dyn BlockFetcher>, object_store: Arc<dyn BlockFetcher>) -> Arc<MatcherPool> {
        let assets = Arc::new(AssetCache::new(bridge_assets::AssetMetadataClient::new(
            reqwest::Client::new(),
            "http://localhost".to_owned(),
        )));
        let anchor_index = AnchorIndex::new(storage.clone());
        let finder = Finder::new(BlockAnchor { block_number: 1, block_timestamp: 0 });
        let mut tunables = Tunables::default();
        tunables.queue_capacity = 10;
        tunables.low_watermark = 10;
        tunables.backfill_threshold = 10;
        tunables.evm_matcher_batch_size = 10;
        MatcherPool::new(storage, anchor_index, assets, finder, rpc, object_store, MatcherMetrics::default(), tunables)
    }

    #[tokio::test]
    async fn producer_switches_to_object_store_past_backfill_threshold() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        for i in 0..15 {
            storage.seed_transfer(sample_transfer(&format!("0x{i}"), 1_000 + i));
        }
        let rpc: Arc<dyn BlockFetcher> = Arc::new(StubFetcher { name: "rpc", blocks: vec![] });
        let object_store: Arc<dyn BlockFetcher> = Arc::new(StubFetcher { name: "object-store", blocks: vec![] });
        let pool = build_pool(storage, rpc, object_store);

        pool.refill().await;
        assert_eq!(pool.active_fetcher.load().name(), "object-store");
    }

    #[tokio::test]
    async fn producer_stays_on_rpc_below_backfill_threshold() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        storage.seed_transfer(sample_transfer("0x1", 1_000));
        let rpc: Arc<dyn BlockFetcher> = Arc::new(StubFetcher { name: "rpc", blocks: vec![] });
        let object_store: Arc<dyn BlockFetcher> = Arc::new(StubFetcher { name: "object-store", blocks: vec![] });
        let pool = build_pool(storage, rpc, object_store);

        pool.refill().await;
        assert_eq!(pool.active_fetcher.load().name(), "rpc");
    }

    #[tokio::test]
    async fn producer_does_not_double_enqueue_an_already_queued_transfer() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        storage.seed_transfer(sample_transfer("0xabc", 1_000));
        let rpc: Arc<dyn BlockFetcher> = Arc::new(StubFetcher { name: "rpc", blocks: vec![] });
        let object_store: Arc<dyn BlockFetcher> = Arc::new(StubFetcher { name: "object-store", blocks: vec![] });
        let pool = build_pool(storage, rpc, object_store);

        pool.refill().await;
        assert_eq!(pool.queue_depth(), 1);
        // The seeded transfer is still PENDING (no consumer drained it), so
        // a second refill would see it again from storage.
        pool.refill().await;
        assert_eq!(pool.queue_depth(), 1, "already-queued transfer must not be enqueued twice");
    }

    #[tokio::test]
    async fn consumer_marks_matched_on_cache_hit() {
        let storage = Arc::new(FakeStorage::new());
        let native = native_system_address();
        let recipient = address!("000000000000000000000000000000000000aa");
        storage.seed_anchor(bridge_primitives::AnchorTx {
            internal_hash: alloy_primitives::B256::repeat_byte(1),
            explorer_hash: alloy_primitives::B256::repeat_byte(2),
            block_number: 42,
            block_hash: alloy_primitives::B256::repeat_byte(3),
            block_timestamp: 1_700_000_001_000,
            from: native,
            asset_recipient: recipient,
            amount_smallest_unit: "1000000000000000000".to_owned(),
            contract_address: None,
        });
        let transfer = Transfer::new_pending(
            "0xdef".to_owned(),
            1_700_000_000_000,
            "native".to_owned(),
            "1.0".to_owned(),
            recipient,
            native,
            Address::ZERO,
            None,
            None,
            None,
        );
        let storage: Arc<dyn Storage> = storage;
        let rpc: Arc<dyn BlockFetcher> = Arc::new(StubFetcher { name: "rpc", blocks: vec![] });
        let object_store: Arc<dyn BlockFetcher> = Arc::new(StubFetcher { name: "object-store", blocks: vec![] });
        let pool = build_pool(storage.clone(), rpc, object_store);

        pool.process(transfer, &CancellationToken::new()).await;

        let pending = storage.get_pending_transfers(10).await.unwrap();
        assert!(pending.is_empty(), "matched transfer must leave the pending set");
    }

    #[tokio::test]
    async fn consumer_marks_failed_on_exhaustive_search() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        let transfer = sample_transfer("0xghi", 5_000);
        storage.insert_transfer_batch(vec![transfer.clone()]).await.unwrap();
        let rpc: Arc<dyn BlockFetcher> = Arc::new(StubFetcher { name: "rpc", blocks: vec![] });
        let object_store: Arc<dyn BlockFetcher> = Arc::new(StubFetcher { name: "object-store", blocks: vec![] });
        let pool = build_pool(storage.clone(), rpc, object_store);

        pool.process(transfer, &CancellationToken::new()).await;

        let pending = storage.get_pending_transfers(10).await.unwrap();
        assert!(pending.is_empty(), "exhaustively-searched transfer must leave the pending set");
        assert_eq!(pool.dedup.len(), 0, "failed transfer must be removed from the dedup set");
    }

    #[tokio::test]
    async fn consumer_leaves_transfer_pending_on_fetch_error() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        let transfer = sample_transfer("0xjkl", 5_000);
        storage.seed_transfer(transfer.clone());
        let rpc: Arc<dyn BlockFetcher> = Arc::new(ErrFetcher);
        let object_store: Arc<dyn BlockFetcher> = Arc::new(ErrFetcher);
        let pool = build_pool(storage.clone(), rpc, object_store);
        pool.dedup.insert(&transfer.core_hash);

        pool.process(transfer.clone(), &CancellationToken::new()).await;

        let pending = storage.get_pending_transfers(10).await.unwrap();
        assert_eq!(pending.len(), 1, "transfer must remain pending after a fetch error");
        assert_eq!(pool.dedup.len(), 0, "dedup entry must be cleared so a later refill retries it");
    }
}
