//! Per-component metric shapes, following `reth-metrics`'s
//! `#[derive(Metrics)]` convention: one struct per component, registered
//! once and cloned into every task that needs to update it. Emission only —
//! wiring an exporter (Prometheus HTTP endpoint or otherwise) is an external
//! concern.

use metrics::{Counter, Gauge, Histogram};
use metrics_derive::Metrics;

/// Metrics for a single indexer worker (one instance per watched address).
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_indexer")]
pub struct IndexerMetrics {
    /// Transfers inserted by the most recent page, summed over the process.
    #[metric(describe = "Total transfers inserted by indexer workers")]
    pub transfers_inserted_total: Counter,
    /// Pages fetched from the CORE ledger.
    #[metric(describe = "Total pages fetched from the CORE ledger")]
    pub pages_fetched_total: Counter,
    /// Rate-limit responses observed.
    #[metric(describe = "Total 429 / rate-limit responses observed by indexers")]
    pub rate_limited_total: Counter,
    /// Count of currently-running indexer worker tasks.
    #[metric(describe = "Number of active indexer worker tasks")]
    pub active_workers: Gauge,
}

/// Metrics for the matcher pool (producer + N consumers).
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_matcher")]
pub struct MatcherMetrics {
    #[metric(describe = "Current depth of the bounded pending-transfer queue")]
    pub queue_depth: Gauge,
    #[metric(describe = "Current size of the queued-hash dedup set")]
    pub dedup_set_size: Gauge,
    #[metric(describe = "Most recently observed pending-transfer count in storage")]
    pub pending_count: Gauge,
    #[metric(describe = "1 if the object-store fetcher is active, 0 if RPC")]
    pub active_fetcher_is_object_store: Gauge,
    #[metric(describe = "Total transfers successfully matched")]
    pub matched_total: Counter,
    #[metric(describe = "Total transfers marked failed after exhaustive search")]
    pub failed_total: Counter,
    #[metric(describe = "Total consumer errors (timeout / fetch / other), left pending")]
    pub error_total: Counter,
}

/// Metrics for the finder (search engine), recorded per `Find` invocation.
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_finder")]
pub struct FinderMetrics {
    #[metric(describe = "Rounds consumed per Find invocation")]
    pub rounds: Histogram,
    #[metric(describe = "Blocks fetched and scanned per Find invocation")]
    pub blocks_searched: Histogram,
    #[metric(describe = "Total cache hits (rounds == 0)")]
    pub cache_hits_total: Counter,
}

/// Metrics for the persistence layer.
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_storage")]
pub struct StorageMetrics {
    #[metric(describe = "Total batch inserts attempted")]
    pub insert_batches_total: Counter,
    #[metric(describe = "Total documents rejected as duplicates on insert")]
    pub duplicates_total: Counter,
    #[metric(describe = "Total storage query errors")]
    pub query_errors_total: Counter,
}

/// Metrics for the shared backoff coordinator.
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_backoff")]
pub struct BackoffMetrics {
    #[metric(describe = "Total Trigger() calls that moved the shared deadline forward")]
    pub triggers_total: Counter,
    #[metric(describe = "Milliseconds until the current shared backoff deadline, 0 if elapsed")]
    pub deadline_remaining_ms: Gauge,
}
