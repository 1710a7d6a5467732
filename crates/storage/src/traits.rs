use alloy_primitives::Address;
use async_trait::async_trait;
use bridge_errors::StorageError;
use bridge_primitives::{AnchorTx, BracketingAnchors, EvmMatch, Transfer, WatchedAddress};

/// Outcome of a duplicate-tolerant batch insert. `duplicates` counts
/// per-document unique-key collisions, which are not errors — callers that
/// expect idempotent retries (the indexer, the finder's background anchor
/// store) treat this as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertOutcome {
    pub inserted: u64,
    pub duplicates: u64,
}

/// The persistence contract (spec §4.A / §6). Every write accepts concurrent
/// callers from every worker; duplicate detection is always delegated to a
/// uniqueness constraint on the backing store, never to an application-level
/// read-then-write.
#[async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Verify (creating if necessary) the unique indexes on `Transfer.coreHash`
    /// and `AnchorTx.internalHash`, plus the compound index backing the
    /// match-tuple query. Fatal at startup if either cannot be created or
    /// verified unique.
    async fn ensure_indexes(&self) -> Result<(), StorageError>;

    /// Unordered batch insert. A per-document duplicate on `coreHash` is
    /// absorbed into `duplicates`; any other per-document error fails the
    /// whole call.
    async fn insert_transfer_batch(&self, transfers: Vec<Transfer>) -> Result<InsertOutcome, StorageError>;

    /// Oldest-first (by `coreTime`) page of `PENDING` transfers.
    async fn get_pending_transfers(&self, limit: usize) -> Result<Vec<Transfer>, StorageError>;

    /// Count of currently `PENDING` transfers, used by the matcher's
    /// strategy-selection step.
    async fn get_pending_count(&self) -> Result<u64, StorageError>;

    /// Idempotent `PENDING -> MATCHED` transition.
    async fn mark_matched(&self, core_hash: &str, evm: EvmMatch) -> Result<(), StorageError>;

    /// Idempotent `PENDING -> FAILED` transition.
    async fn mark_failed(&self, core_hash: &str, reason: String) -> Result<(), StorageError>;

    /// Idempotent batch insert of observed system transactions; silently
    /// absorbs duplicates exactly like `insert_transfer_batch`.
    async fn insert_anchor_tx_batch(&self, anchors: Vec<AnchorTx>) -> Result<InsertOutcome, StorageError>;

    /// The greatest anchor at or before `target_time`, and the least
    /// strictly after it, each projected to `{blockNumber, blockTimestamp}`.
    /// Implemented as two independent one-shot lookups.
    async fn find_bracketing_anchors(&self, target_time: u64) -> Result<BracketingAnchors, StorageError>;

    /// Earliest anchor in `[min_time, max_time]` matching the three-field
    /// match tuple, or `None`.
    async fn find_matching_anchor(
        &self,
        from: Address,
        asset_recipient: Address,
        amount_smallest_unit: &str,
        min_time: u64,
        max_time: u64,
    ) -> Result<Option<AnchorTx>, StorageError>;

    /// All configured watched addresses, active or not (the controller
    /// reconciles against the full set).
    async fn get_watched_addresses(&self) -> Result<Vec<WatchedAddress>, StorageError>;

    /// Insert a new watched address at configuration time. A duplicate
    /// `address` is absorbed, not an error.
    async fn upsert_watched_address(&self, watched: WatchedAddress) -> Result<(), StorageError>;

    /// Advance `lastIndexedTime` for `address`. Callers only ever pass a
    /// value `>=` the previous cursor; monotonicity is the caller's
    /// responsibility (the per-address worker's `max(update.time)` rule).
    async fn update_cursor(&self, address: Address, last_indexed_time: u64) -> Result<(), StorageError>;
}
