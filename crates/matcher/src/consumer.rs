use crate::MatcherPool;
use bridge_errors::FindError;
use bridge_primitives::Transfer;
use bridge_tasks::CancellationToken;

impl MatcherPool {
    /// One of `evm_matcher_concurrency` identical workers (spec §4.F): pull
    /// a transfer off the shared queue, resolve it through the finder under
    /// a per-transfer deadline, and persist whatever the outcome is.
    pub(crate) async fn run_consumer(&self, token: CancellationToken) {
        loop {
            let transfer = {
                let mut receiver = self.receiver.lock().await;
                tokio::select! {
                    () = token.cancelled() => return,
                    transfer = receiver.recv() => transfer,
                }
            };
            let Some(transfer) = transfer else {
                // The sender half was dropped: the producer has shut down.
                return;
            };
            self.process(transfer, &token).await;
        }
    }

    pub(crate) async fn process(&self, transfer: Transfer, token: &CancellationToken) {
        let fetcher = self.active_fetcher.load_full();
        let decimals = self.assets.decimals_for_system_address(transfer.system_address).await;

        let outcome = tokio::select! {
            () = token.cancelled() => return,
            outcome = tokio::time::timeout(
                self.tunables.transfer_match_timeout,
                self.finder.find(&transfer, decimals, &self.anchor_index, &*fetcher),
            ) => outcome,
        };

        match outcome {
            Ok(Ok(found)) => {
                let core_hash = transfer.core_hash.clone();
                if let Err(error) = self.storage.mark_matched(&core_hash, found.into_evm_match()).await {
                    tracing::warn!(target: "matcher", core_hash = %core_hash, %error, "failed to persist match");
                    self.dedup.remove(&core_hash);
                } else {
                    self.metrics.matched_total.increment(1);
                }
            }
            Ok(Err(FindError::NotFound { blocks_searched })) => {
                let reason = format!("not found after searching {blocks_searched} blocks");
                if let Err(error) = self.storage.mark_failed(&transfer.core_hash, reason).await {
                    tracing::warn!(target: "matcher", core_hash = %transfer.core_hash, %error, "failed to persist failure");
                }
                self.dedup.remove(&transfer.core_hash);
                self.metrics.failed_total.increment(1);
            }
            Ok(Err(error)) => {
                tracing::debug!(target: "matcher", core_hash = %transfer.core_hash, %error, "leaving pending after fetch error");
                self.dedup.remove(&transfer.core_hash);
                self.metrics.error_total.increment(1);
            }
            Err(_elapsed) => {
                tracing::debug!(target: "matcher", core_hash = %transfer.core_hash, "leaving pending after per-transfer timeout");
                self.dedup.remove(&transfer.core_hash);
                self.metrics.error_total.increment(1);
            }
        }
    }
}
