use crate::MatcherPool;
use bridge_tasks::CancellationToken;
use std::sync::Arc;

impl MatcherPool {
    /// The single producer loop (spec §4.F): every `refill_interval`, if the
    /// queue is below `low_watermark`, read the pending count, pick a fetch
    /// strategy, and pull oldest-first pending transfers up to the
    /// remaining queue capacity.
    pub(crate) async fn run_producer(&self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.tunables.refill_interval);
        loop {
            tokio::select! {
                () = token.cancelled() => {
                    tracing::debug!(target: "matcher", "producer shutting down");
                    return;
                }
                _ = interval.tick() => {
                    self.refill().await;
                }
            }
        }
    }

    pub(crate) async fn refill(&self) {
        let depth = self.queue_depth();
        self.metrics.queue_depth.set(depth as f64);
        if depth >= self.tunables.low_watermark {
            return;
        }

        let pending_count = match self.storage.get_pending_count().await {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!(target: "matcher", %error, "failed to read pending count");
                return;
            }
        };
        self.metrics.pending_count.set(pending_count as f64);
        self.select_fetcher(pending_count as usize > self.tunables.backfill_threshold);

        let available = self.tunables.queue_capacity.saturating_sub(depth);
        let limit = available.min(self.tunables.evm_matcher_batch_size);
        if limit == 0 {
            return;
        }

        let transfers = match self.storage.get_pending_transfers(limit).await {
            Ok(transfers) => transfers,
            Err(error) => {
                tracing::warn!(target: "matcher", %error, "failed to read pending transfers");
                return;
            }
        };

        for transfer in transfers {
            if !self.dedup.insert(&transfer.core_hash) {
                continue;
            }
            if self.sender.send(transfer).await.is_err() {
                // Every consumer has dropped its receiver handle; the pool
                // is tearing down.
                return;
            }
        }
        self.metrics.dedup_set_size.set(self.dedup.len() as f64);
    }

    pub(crate) fn queue_depth(&self) -> usize {
        self.tunables.queue_capacity.saturating_sub(self.sender.capacity())
    }

    fn select_fetcher(&self, use_object_store: bool) {
        let current_is_object_store = self.active_fetcher.load().name() == self.object_store_fetcher.name();
        if use_object_store == current_is_object_store {
            return;
        }
        let next: Arc<dyn bridge_evm_fetch::BlockFetcher> =
            if use_object_store { Arc::clone(&self.object_store_fetcher) } else { Arc::clone(&self.rpc_fetcher) };
        tracing::info!(target: "matcher", strategy = next.name(), "switching active fetch strategy");
        self.metrics.active_fetcher_is_object_store.set(if use_object_store { 1.0 } else { 0.0 });
        self.active_fetcher.store(next);
    }
}
