use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every numeric/duration knob named in the external-interfaces contract.
/// Defaults match the values given throughout the component design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// `CORE_INDEXER_POLL`: sleep interval for a caught-up indexer worker.
    #[serde(with = "humantime_serde")]
    pub core_indexer_poll: Duration,
    /// `EVM_MATCHER_BATCH_SIZE`: max pending transfers pulled per refill.
    pub evm_matcher_batch_size: usize,
    /// `EVM_MATCHER_CONCURRENCY`: consumer worker count, `N`.
    pub evm_matcher_concurrency: usize,
    /// `MAX_BATCH_SIZE`: cap on RPC batch size (block numbers per call).
    pub max_batch_size: usize,
    /// `BACKFILL_THRESHOLD`: pending-count above which the object-store
    /// fetcher is selected.
    pub backfill_threshold: usize,
    /// `Q`: bounded queue capacity.
    pub queue_capacity: usize,
    /// `LOW_WATERMARK`: refill trigger.
    pub low_watermark: usize,
    /// Producer refill cadence, `REFILL_INTERVAL`.
    #[serde(with = "humantime_serde")]
    pub refill_interval: Duration,
    /// Controller reconciliation cadence for the indexer fleet.
    #[serde(with = "humantime_serde")]
    pub controller_reconcile_interval: Duration,
    /// Periodic stats-logger cadence.
    #[serde(with = "humantime_serde")]
    pub stats_log_interval: Duration,
    /// CORE ledger request timeout.
    #[serde(with = "humantime_serde")]
    pub core_request_timeout: Duration,
    /// Block-fetch request timeout.
    #[serde(with = "humantime_serde")]
    pub block_fetch_timeout: Duration,
    /// Per-transfer match timeout (cap on total search time).
    #[serde(with = "humantime_serde")]
    pub transfer_match_timeout: Duration,
    /// Max attempts for fetcher transient-error retry.
    pub fetch_retry_attempts: u32,
    /// Max attempts for indexer non-rate-limit retry.
    pub indexer_retry_attempts: u32,
    /// Dedup-set high-water mark before truncation.
    pub dedup_set_max: usize,
    /// Dedup-set size retained after truncation.
    pub dedup_set_retain: usize,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            core_indexer_poll: Duration::from_secs(30),
            evm_matcher_batch_size: 256,
            evm_matcher_concurrency: 256,
            max_batch_size: 20,
            backfill_threshold: 10,
            queue_capacity: 2048,
            low_watermark: 100,
            refill_interval: Duration::from_secs(1),
            controller_reconcile_interval: Duration::from_secs(30),
            stats_log_interval: Duration::from_secs(15),
            core_request_timeout: Duration::from_secs(30),
            block_fetch_timeout: Duration::from_secs(30),
            transfer_match_timeout: Duration::from_secs(60),
            fetch_retry_attempts: 3,
            indexer_retry_attempts: 5,
            dedup_set_max: 10_000,
            dedup_set_retain: 5_000,
        }
    }
}
