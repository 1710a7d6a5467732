use crate::client::{CoreLedgerClient, Delta, LedgerEntry};
use bridge_config::Tunables;
use bridge_errors::FetchError;
use bridge_metrics::IndexerMetrics;
use bridge_primitives::{is_system_address, Transfer};
use bridge_storage::Storage;
use bridge_tasks::{jittered_backoff, retry_with_backoff, BackoffCoordinator, CancellationToken};
use std::sync::Arc;
use std::time::Duration;

/// One worker per watched address (spec §4.G): polls the CORE source with a
/// local `cursor`, inserts newly-observed spot transfers, and advances the
/// cursor by the *received* page maximum rather than the *inserted* count
/// (the API is inclusive-start and may redeliver rows the cursor already
/// covers).
pub(crate) struct IndexerWorker {
    address: alloy_primitives::Address,
    client: CoreLedgerClient,
    storage: Arc<dyn Storage>,
    backoff: BackoffCoordinator,
    metrics: IndexerMetrics,
    tunables: Tunables,
}

impl IndexerWorker {
    pub(crate) fn new(
        address: alloy_primitives::Address,
        client: CoreLedgerClient,
        storage: Arc<dyn Storage>,
        backoff: BackoffCoordinator,
        metrics: IndexerMetrics,
        tunables: Tunables,
    ) -> Self {
        Self { address, client, storage, backoff, metrics, tunables }
    }

    /// Run until `token` is cancelled. `cursor` is the worker's local
    /// progress state, seeded from `WatchedAddress::last_indexed_time` and
    /// persisted via `Storage::update_cursor` after every successful page.
    pub(crate) async fn run(self, mut cursor: u64, token: CancellationToken) {
        loop {
            if token.is_cancelled() {
                return;
            }
            self.backoff.wait().await;

            let fetch = tokio::select! {
                () = token.cancelled() => return,
                result = tokio::time::timeout(self.tunables.core_request_timeout, self.fetch_with_retry(cursor)) => result,
            };

            let entries = match fetch {
                Ok(Ok(entries)) => entries,
                Ok(Err(error)) => {
                    tracing::warn!(
                        target: "indexer", address = %self.address, %error,
                        "failed to fetch CORE ledger page after retries"
                    );
                    sleep_or_cancel(self.tunables.core_indexer_poll, &token).await;
                    continue;
                }
                Err(_elapsed) => {
                    tracing::warn!(target: "indexer", address = %self.address, "CORE ledger request timed out");
                    sleep_or_cancel(self.tunables.core_indexer_poll, &token).await;
                    continue;
                }
            };

            self.metrics.pages_fetched_total.increment(1);

            if entries.is_empty() {
                sleep_or_cancel(self.tunables.core_indexer_poll, &token).await;
                continue;
            }

            let Some(page_max) = entries.iter().map(|e| e.time).max() else {
                sleep_or_cancel(self.tunables.core_indexer_poll, &token).await;
                continue;
            };

            let transfers: Vec<Transfer> = entries.iter().filter_map(|e| self.as_pending_transfer(e)).collect();

            let inserted = if transfers.is_empty() {
                0
            } else {
                match self.storage.insert_transfer_batch(transfers).await {
                    Ok(outcome) => {
                        self.metrics.transfers_inserted_total.increment(outcome.inserted);
                        outcome.inserted
                    }
                    Err(error) => {
                        tracing::warn!(target: "indexer", address = %self.address, %error, "failed to insert transfer batch");
                        // Don't advance the cursor past a page we failed to persist;
                        // the next iteration re-fetches and retries the same range.
                        sleep_or_cancel(self.tunables.core_indexer_poll, &token).await;
                        continue;
                    }
                }
            };

            cursor = page_max;
            if let Err(error) = self.storage.update_cursor(self.address, cursor).await {
                tracing::warn!(target: "indexer", address = %self.address, %error, "failed to persist cursor");
            }

            // Source of truth for "still backfilling" is the inserted
            // count, not the received count: a page that's entirely
            // redelivered duplicates must not spin the loop hot.
            if inserted == 0 {
                sleep_or_cancel(self.tunables.core_indexer_poll, &token).await;
            }
        }
    }

    async fn fetch_with_retry(&self, cursor: u64) -> Result<Vec<LedgerEntry>, FetchError> {
        let schedule = jittered_backoff(Duration::from_secs(1), self.tunables.indexer_retry_attempts as usize);
        let address = self.address;
        retry_with_backoff("indexer::core-ledger", schedule, || async {
            match self.client.fetch_updates(address, cursor).await {
                Ok(entries) => Ok(entries),
                Err(FetchError::RateLimited(retry_after)) => {
                    self.metrics.rate_limited_total.increment(1);
                    // Spec §4.G: push the shared deadline out by 1.1x the
                    // advertised Retry-After before this attempt is retried.
                    let scaled = Duration::from_secs_f64(retry_after.as_secs_f64() * 1.1);
                    self.backoff.trigger(scaled);
                    Err(FetchError::RateLimited(retry_after))
                }
                Err(other) => Err(other),
            }
        })
        .await
    }

    /// Normalize a ledger entry into a pending [`Transfer`] if it's an
    /// outgoing spot transfer whose destination is a system address — the
    /// only kind of delta that materializes on the EVM chain. `destination`
    /// is the bridge's system address (encodes which token moved); the EVM
    /// recipient is the same account that sent the CORE-side transfer, so
    /// `recipient` is the entry's `user` field, not `destination`.
    fn as_pending_transfer(&self, entry: &LedgerEntry) -> Option<Transfer> {
        let Delta::SpotTransfer { token, amount, user, destination, usdc_value, fee, native_token_fee } =
            &entry.delta
        else {
            return None;
        };
        if !is_system_address(*destination) {
            return None;
        }
        Some(Transfer::new_pending(
            entry.hash.clone(),
            entry.time,
            token.clone(),
            amount.clone(),
            *user,
            *destination,
            self.address,
            usdc_value.clone(),
            fee.clone(),
            native_token_fee.clone(),
        ))
    }
}

async fn sleep_or_cancel(duration: Duration, token: &CancellationToken) {
    tokio::select! {
        () = token.cancelled() => {}
        () = tokio::time::sleep(duration) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Delta;
    use alloy_primitives::address;
    use bridge_metrics::IndexerMetrics;
    use bridge_storage::FakeStorage;

    fn worker(address: alloy_primitives::Address) -> IndexerWorker {
        IndexerWorker::new(
            address,
            CoreLedgerClient::new(reqwest::Client::new(), "http://localhost".to_owned()),
            Arc::new(FakeStorage::new()),
            BackoffCoordinator::new(),
            IndexerMetrics::default(),
            Tunables::default(),
        )
    }

    fn spot_transfer_entry(destination: alloy_primitives::Address, user: alloy_primitives::Address) -> LedgerEntry {
        LedgerEntry {
            time: 1_000,
            hash: "0xabc".to_owned(),
            delta: Delta::SpotTransfer {
                token: "USDC".to_owned(),
                amount: "1.5".to_owned(),
                user,
                destination,
                usdc_value: None,
                fee: None,
                native_token_fee: None,
            },
        }
    }

    #[test]
    fn spot_transfer_to_a_system_address_becomes_a_pending_transfer() {
        let watched = address!("000000000000000000000000000000000000aa");
        let worker = worker(watched);
        let entry = spot_transfer_entry(bridge_primitives::native_system_address(), watched);

        let transfer = worker.as_pending_transfer(&entry).expect("native-token transfer must be recognized");
        assert_eq!(transfer.recipient, watched);
        assert_eq!(transfer.system_address, bridge_primitives::native_system_address());
        assert_eq!(transfer.watched_sender, watched);
        assert_eq!(transfer.core_hash, "0xabc");
    }

    #[test]
    fn spot_transfer_to_a_non_system_address_is_filtered_out() {
        let watched = address!("000000000000000000000000000000000000aa");
        let worker = worker(watched);
        let entry = spot_transfer_entry(address!("000000000000000000000000000000000000bb"), watched);

        assert!(worker.as_pending_transfer(&entry).is_none(), "a transfer to a non-bridge address must be skipped");
    }

    #[test]
    fn a_non_spot_transfer_delta_is_ignored() {
        let watched = address!("000000000000000000000000000000000000aa");
        let worker = worker(watched);
        let entry = LedgerEntry { time: 1_000, hash: "0xdef".to_owned(), delta: Delta::Other };

        assert!(worker.as_pending_transfer(&entry).is_none());
    }
}
