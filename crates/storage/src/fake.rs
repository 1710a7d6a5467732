use alloy_primitives::Address;
use async_trait::async_trait;
use bridge_errors::StorageError;
use bridge_primitives::{AnchorTx, BracketingAnchors, EvmMatch, Transfer, TransferStatus, WatchedAddress};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::traits::InsertOutcome;

/// An in-memory [`crate::Storage`] used by the finder/matcher/indexer test
/// suites so they don't need a live MongoDB. Mirrors the teacher's
/// hand-rolled-fake-over-mocking-crate style (e.g. `ParliaClient`'s
/// storage-then-network fallback): a plain struct behind a mutex, no trait
/// object magic.
#[derive(Debug, Default)]
pub struct FakeStorage {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    transfers: HashMap<String, Transfer>,
    anchors: HashMap<alloy_primitives::B256, AnchorTx>,
    watched: HashMap<Address, WatchedAddress>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: snapshot every stored anchor, for assertions.
    pub fn anchors(&self) -> Vec<AnchorTx> {
        self.inner.lock().anchors.values().cloned().collect()
    }

    /// Test helper: seed a transfer directly, bypassing the insert-batch
    /// duplicate bookkeeping.
    pub fn seed_transfer(&self, transfer: Transfer) {
        self.inner.lock().transfers.insert(transfer.core_hash.clone(), transfer);
    }

    /// Test helper: seed an anchor directly.
    pub fn seed_anchor(&self, anchor: AnchorTx) {
        self.inner.lock().anchors.insert(anchor.internal_hash, anchor);
    }

    /// Test helper: flip a watched address's `is_active` flag directly,
    /// simulating an external deactivation the controller must reconcile.
    pub fn update_is_active(&self, address: Address, is_active: bool) {
        if let Some(watched) = self.inner.lock().watched.get_mut(&address) {
            watched.is_active = is_active;
        }
    }
}

#[async_trait]
impl crate::Storage for FakeStorage {
    async fn ensure_indexes(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn insert_transfer_batch(&self, transfers: Vec<Transfer>) -> Result<InsertOutcome, StorageError> {
        let mut inner = self.inner.lock();
        let mut outcome = InsertOutcome::default();
        for transfer in transfers {
            if inner.transfers.contains_key(&transfer.core_hash) {
                outcome.duplicates += 1;
            } else {
                inner.transfers.insert(transfer.core_hash.clone(), transfer);
                outcome.inserted += 1;
            }
        }
        Ok(outcome)
    }

    async fn get_pending_transfers(&self, limit: usize) -> Result<Vec<Transfer>, StorageError> {
        let inner = self.inner.lock();
        let mut pending: Vec<_> =
            inner.transfers.values().filter(|t| t.status == TransferStatus::Pending).cloned().collect();
        pending.sort_by_key(|t| t.core_time);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn get_pending_count(&self) -> Result<u64, StorageError> {
        let inner = self.inner.lock();
        Ok(inner.transfers.values().filter(|t| t.status == TransferStatus::Pending).count() as u64)
    }

    async fn mark_matched(&self, core_hash: &str, evm: EvmMatch) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if let Some(transfer) = inner.transfers.get_mut(core_hash) {
            transfer.mark_matched(evm);
        }
        Ok(())
    }

    async fn mark_failed(&self, core_hash: &str, reason: String) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if let Some(transfer) = inner.transfers.get_mut(core_hash) {
            transfer.mark_failed(reason);
        }
        Ok(())
    }

    async fn insert_anchor_tx_batch(&self, anchors: Vec<AnchorTx>) -> Result<InsertOutcome, StorageError> {
        let mut inner = self.inner.lock();
        let mut outcome = InsertOutcome::default();
        for anchor in anchors {
            if inner.anchors.contains_key(&anchor.internal_hash) {
                outcome.duplicates += 1;
            } else {
                inner.anchors.insert(anchor.internal_hash, anchor);
                outcome.inserted += 1;
            }
        }
        Ok(outcome)
    }

    async fn find_bracketing_anchors(&self, target_time: u64) -> Result<BracketingAnchors, StorageError> {
        let inner = self.inner.lock();
        let before = inner
            .anchors
            .values()
            .filter(|a| a.block_timestamp <= target_time)
            .max_by_key(|a| a.block_timestamp)
            .map(AnchorTx::as_bracket);
        let after = inner
            .anchors
            .values()
            .filter(|a| a.block_timestamp > target_time)
            .min_by_key(|a| a.block_timestamp)
            .map(AnchorTx::as_bracket);
        Ok(BracketingAnchors { before, after })
    }

    async fn find_matching_anchor(
        &self,
        from: Address,
        asset_recipient: Address,
        amount_smallest_unit: &str,
        min_time: u64,
        max_time: u64,
    ) -> Result<Option<AnchorTx>, StorageError> {
        let inner = self.inner.lock();
        Ok(inner
            .anchors
            .values()
            .filter(|a| {
                a.from == from
                    && a.asset_recipient == asset_recipient
                    && a.amount_smallest_unit == amount_smallest_unit
                    && a.block_timestamp >= min_time
                    && a.block_timestamp <= max_time
            })
            .min_by_key(|a| a.block_timestamp)
            .cloned())
    }

    async fn get_watched_addresses(&self) -> Result<Vec<WatchedAddress>, StorageError> {
        Ok(self.inner.lock().watched.values().copied().collect())
    }

    async fn upsert_watched_address(&self, watched: WatchedAddress) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner.watched.entry(watched.address).or_insert(watched);
        Ok(())
    }

    async fn update_cursor(&self, address: Address, last_indexed_time: u64) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if let Some(watched) = inner.watched.get_mut(&address) {
            watched.last_indexed_time = last_indexed_time;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_primitives::Transfer;

    fn sample_transfer(hash: &str) -> Transfer {
        Transfer::new_pending(
            hash.to_owned(),
            1_000,
            "USDC".to_owned(),
            "1.0".to_owned(),
            Address::ZERO,
            Address::ZERO,
            Address::ZERO,
            None,
            None,
            None,
        )
    }

    #[tokio::test]
    async fn duplicate_insert_is_not_an_error() {
        let storage = FakeStorage::new();
        let outcome = crate::Storage::insert_transfer_batch(&storage, vec![sample_transfer("0xabc")]).await.unwrap();
        assert_eq!(outcome.inserted, 1);
        let outcome = crate::Storage::insert_transfer_batch(&storage, vec![sample_transfer("0xabc")]).await.unwrap();
        assert_eq!(outcome, InsertOutcome { inserted: 0, duplicates: 1 });
    }

    #[tokio::test]
    async fn matched_transfer_leaves_pending_set() {
        let storage = FakeStorage::new();
        crate::Storage::insert_transfer_batch(&storage, vec![sample_transfer("0xabc")]).await.unwrap();
        crate::Storage::mark_matched(
            &storage,
            "0xabc",
            EvmMatch {
                internal_hash: Default::default(),
                explorer_hash: Default::default(),
                block_number: 1,
                block_hash: Default::default(),
                block_time: 1,
                contract_address: None,
            },
        )
        .await
        .unwrap();
        let pending = crate::Storage::get_pending_transfers(&storage, 10).await.unwrap();
        assert!(pending.is_empty());
    }
}
