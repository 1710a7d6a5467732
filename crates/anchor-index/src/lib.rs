//! A thin façade over `bridge-storage` (spec §4.D): the two read queries the
//! finder needs to bracket a target timestamp and probe the correlation
//! cache, plus a fire-and-forget background store of newly-fetched blocks'
//! anchors.

use alloy_primitives::Address;
use bridge_errors::StorageError;
use bridge_primitives::{AnchorTx, BlockData, BracketingAnchors};
use bridge_storage::Storage;
use std::sync::Arc;

/// Query surface the finder drives its interpolation search through.
/// Holds no state of its own beyond the shared [`Storage`] handle; it exists
/// as a named seam (spec §4.D) rather than letting the finder depend on
/// `bridge-storage` directly, and to give the background-store helper a
/// home.
#[derive(Debug, Clone)]
pub struct AnchorIndex {
    storage: Arc<dyn Storage>,
}

impl AnchorIndex {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Earliest anchor in `[min_time, max_time]` matching the three-field
    /// match tuple (spec §4.A `FindMatchingAnchor`).
    pub async fn find_matching_anchor(
        &self,
        from: Address,
        asset_recipient: Address,
        amount_smallest_unit: &str,
        min_time: u64,
        max_time: u64,
    ) -> Result<Option<AnchorTx>, StorageError> {
        self.storage.find_matching_anchor(from, asset_recipient, amount_smallest_unit, min_time, max_time).await
    }

    /// The anchors bracketing `target_time` (spec §4.A
    /// `FindBracketingAnchors`).
    pub async fn find_bracketing_anchors(&self, target_time: u64) -> Result<BracketingAnchors, StorageError> {
        self.storage.find_bracketing_anchors(target_time).await
    }

    /// Store every system transaction in `block` as an anchor, without
    /// waiting for completion. Every fetched block becomes an anchor for
    /// future searches regardless of whether it matched the transfer it was
    /// fetched for, so the finder must never block its own search loop on
    /// this write. Failures are logged, not propagated.
    pub fn store_block_in_background(&self, block: BlockData) {
        let storage = Arc::clone(&self.storage);
        tokio::spawn(async move {
            if block.system_txs.is_empty() {
                return;
            }
            let anchors: Vec<AnchorTx> = block
                .system_txs
                .into_iter()
                .map(|tx| tx.into_anchor(block.number, block.hash, block.timestamp))
                .collect();
            let count = anchors.len();
            match storage.insert_anchor_tx_batch(anchors).await {
                Ok(outcome) => {
                    tracing::debug!(
                        target: "anchor_index",
                        block = block.number,
                        inserted = outcome.inserted,
                        duplicates = outcome.duplicates,
                        "stored block anchors in background"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        target: "anchor_index",
                        block = block.number,
                        %error,
                        attempted = count,
                        "background anchor store failed"
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, B256};
    use bridge_primitives::SystemTx;
    use bridge_storage::FakeStorage;
    use std::time::Duration;

    #[tokio::test]
    async fn background_store_is_fire_and_forget() {
        let storage = Arc::new(FakeStorage::new());
        let index = AnchorIndex::new(storage.clone());

        let block = BlockData {
            number: 100,
            hash: B256::repeat_byte(0xaa),
            timestamp: 1_000,
            system_txs: vec![SystemTx {
                internal_hash: B256::repeat_byte(0x01),
                explorer_hash: B256::repeat_byte(0x02),
                from: address!("2222222222222222222222222222222222222222"),
                asset_recipient: address!("000000000000000000000000000000000000aa"),
                amount_smallest_unit: "100".to_owned(),
                contract_address: None,
            }],
        };

        index.store_block_in_background(block);
        // Give the spawned task a chance to run without blocking the caller.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(storage.anchors().len(), 1);
    }
}
