//! The search engine (spec §4.E): resolves a CORE transfer to its EVM
//! transaction by probing the anchor cache, then a bounded-round binary
//! search with linear interpolation over a growing anchor index. Every
//! fetched block densifies the index for future searches, so expected
//! rounds drop over time.

mod bounds;
mod result;

pub use result::FindResult;

use alloy_primitives::Address;
use bounds::Bounds;
use bridge_anchor_index::AnchorIndex;
use bridge_errors::FindError;
use bridge_evm_fetch::BlockFetcher;
use bridge_primitives::{parse_amount, AnchorTx, BlockAnchor, Transfer};
use num_bigint::BigUint;
use std::time::{Duration, Instant};

/// Bounded rounds of fetch-and-tighten before the search gives up and
/// declares the transfer definitively absent.
pub const MAX_ROUNDS: u32 = 20;

/// Contiguous block numbers fetched per round, centered on the current
/// interpolated estimate.
pub const BATCH_SIZE: u64 = 5;

/// Cache-probe window around a transfer's `coreTime`: asymmetric on purpose
/// to absorb clock skew between CORE and EVM in the "before" direction.
/// A tunable, not a semantic constant (spec §9 open question).
const CACHE_WINDOW_BEFORE: Duration = Duration::from_secs(5);
const CACHE_WINDOW_AFTER: Duration = Duration::from_secs(120);

/// Default extrapolation rate used when only a lower bound anchor exists:
/// one block per second.
const DEFAULT_BLOCK_RATE_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy)]
pub struct Finder {
    /// Seed anchor used as the lower bound when the anchor index is empty.
    pub genesis: BlockAnchor,
}

impl Finder {
    pub const fn new(genesis: BlockAnchor) -> Self {
        Self { genesis }
    }

    /// Resolve `transfer` to its EVM transaction using `fetcher` for any
    /// block fetches the search needs. Returns `Err(FindError::NotFound)` if
    /// the search exhausts its rounds or the bounds collapse without a
    /// match; any other error leaves the transfer `PENDING` for retry.
    pub async fn find(
        &self,
        transfer: &Transfer,
        evm_decimals: u32,
        anchor_index: &AnchorIndex,
        fetcher: &dyn BlockFetcher,
    ) -> Result<FindResult, FindError> {
        let started = Instant::now();
        let target_amount =
            parse_amount(&transfer.amount, evm_decimals).map_err(|e| FindError::Fetch(bridge_errors::FetchError::ProtocolViolation(e.to_string())))?;

        if let Some(anchor) = self.probe_cache(transfer, &target_amount, anchor_index).await? {
            tracing::debug!(target: "finder", core_hash = %transfer.core_hash, "cache hit");
            return Ok(FindResult::from_anchor(anchor, 0, 0, started.elapsed()));
        }

        let bracketing = anchor_index.find_bracketing_anchors(transfer.core_time).await?;
        let mut bounds = Bounds::initial(self.genesis, bracketing);

        let mut blocks_searched: u64 = 0;
        for round in 1..=MAX_ROUNDS {
            let estimate = bounds.estimate(transfer.core_time, DEFAULT_BLOCK_RATE_MS);
            let batch = build_batch(estimate, &bounds);

            let fetched = fetcher.fetch_blocks(&batch).await?;
            blocks_searched += fetched.len() as u64;

            for block in &fetched {
                anchor_index.store_block_in_background(block.clone());
            }

            if let Some(hit) = scan_for_match(&fetched, transfer.system_address, transfer.recipient, &target_amount) {
                tracing::debug!(
                    target: "finder",
                    core_hash = %transfer.core_hash,
                    round,
                    blocks_searched,
                    "match found"
                );
                return Ok(FindResult::from_anchor(hit, round, blocks_searched, started.elapsed()));
            }

            bounds.tighten(transfer.core_time, &fetched);

            if bounds.is_collapsed() {
                tracing::debug!(target: "finder", core_hash = %transfer.core_hash, blocks_searched, "bounds collapsed with no match");
                return Err(FindError::NotFound { blocks_searched });
            }
        }

        tracing::debug!(target: "finder", core_hash = %transfer.core_hash, blocks_searched, "rounds exhausted with no match");
        Err(FindError::NotFound { blocks_searched })
    }

    async fn probe_cache(
        &self,
        transfer: &Transfer,
        target_amount: &BigUint,
        anchor_index: &AnchorIndex,
    ) -> Result<Option<AnchorTx>, FindError> {
        let min_time = transfer.core_time.saturating_sub(CACHE_WINDOW_BEFORE.as_millis() as u64);
        let max_time = transfer.core_time + CACHE_WINDOW_AFTER.as_millis() as u64;
        let anchor = anchor_index
            .find_matching_anchor(
                transfer.system_address,
                transfer.recipient,
                &target_amount.to_string(),
                min_time,
                max_time,
            )
            .await?;
        Ok(anchor)
    }
}

fn build_batch(estimate: u64, bounds: &Bounds) -> Vec<u64> {
    let half = BATCH_SIZE / 2;
    let lo_limit = bounds.lower().block_number.max(1);
    let hi_limit = bounds.upper_limit();

    let mut start = estimate.saturating_sub(half).max(lo_limit);
    let mut end = start + BATCH_SIZE - 1;
    if let Some(hi_limit) = hi_limit {
        if end > hi_limit {
            end = hi_limit;
            start = end.saturating_sub(BATCH_SIZE - 1).max(lo_limit);
        }
    }
    (start..=end).collect()
}

fn scan_for_match(
    blocks: &[bridge_primitives::BlockData],
    system_address: Address,
    recipient: Address,
    target_amount: &BigUint,
) -> Option<AnchorTx> {
    let target = target_amount.to_string();
    for block in blocks {
        for tx in &block.system_txs {
            if tx.from == system_address && tx.asset_recipient == recipient && tx.amount_smallest_unit == target {
                return Some(tx.clone().into_anchor(block.number, block.hash, block.timestamp));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, B256};
    use async_trait::async_trait;
    use bridge_errors::{FetchError, StorageError};
    use bridge_primitives::{BlockData, SystemTx, Transfer};
    use bridge_storage::{FakeStorage, Storage};
    use std::sync::Arc;

    #[derive(Debug)]
    struct StubFetcher {
        blocks: Vec<bridge_primitives::BlockData>,
    }

    #[async_trait]
    impl BlockFetcher for StubFetcher {
        async fn fetch_blocks(&self, block_numbers: &[u64]) -> Result<Vec<bridge_primitives::BlockData>, FetchError> {
            Ok(self.blocks.iter().filter(|b| block_numbers.contains(&b.number)).cloned().collect())
        }
        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn transfer(core_time: u64, amount: &str, recipient: Address, system_address: Address) -> Transfer {
        Transfer::new_pending(
            "0xabc".to_owned(),
            core_time,
            "native".to_owned(),
            amount.to_owned(),
            recipient,
            system_address,
            Address::ZERO,
            None,
            None,
            None,
        )
    }

    #[tokio::test]
    async fn cache_hit_returns_zero_rounds() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        let index = AnchorIndex::new(storage.clone());
        let native = address!("2222222222222222222222222222222222222222");
        let recipient = address!("000000000000000000000000000000000000aa");

        storage
            .insert_anchor_tx_batch(vec![AnchorTx {
                internal_hash: B256::repeat_byte(1),
                explorer_hash: B256::repeat_byte(2),
                block_number: 42,
                block_hash: B256::repeat_byte(3),
                block_timestamp: 1_700_000_001_000,
                from: native,
                asset_recipient: recipient,
                amount_smallest_unit: "100500000000000000000".to_owned(),
                contract_address: None,
            }])
            .await
            .unwrap();

        let xfer = transfer(1_700_000_000_000, "100.5", recipient, native);
        let finder = Finder::new(BlockAnchor { block_number: 1, block_timestamp: 0 });
        let fetcher = StubFetcher { blocks: vec![] };

        let result = finder.find(&xfer, 18, &index, &fetcher).await.unwrap();
        assert_eq!(result.rounds, 0);
        assert_eq!(result.blocks_searched, 0);
        assert_eq!(result.block_number, 42);
    }

    #[tokio::test]
    async fn interpolation_converges_within_a_few_rounds() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        let index = AnchorIndex::new(storage.clone());
        let native = address!("2222222222222222222222222222222222222222");
        let recipient = address!("000000000000000000000000000000000000aa");

        storage
            .insert_anchor_tx_batch(vec![
                AnchorTx {
                    internal_hash: B256::repeat_byte(10),
                    explorer_hash: B256::repeat_byte(11),
                    block_number: 1_000,
                    block_hash: B256::repeat_byte(12),
                    block_timestamp: 1_700_000_000_000,
                    from: native,
                    asset_recipient: recipient,
                    amount_smallest_unit: "1".to_owned(),
                    contract_address: None,
                },
                AnchorTx {
                    internal_hash: B256::repeat_byte(13),
                    explorer_hash: B256::repeat_byte(14),
                    block_number: 2_000,
                    block_hash: B256::repeat_byte(15),
                    block_timestamp: 1_700_001_000_000,
                    from: native,
                    asset_recipient: recipient,
                    amount_smallest_unit: "1".to_owned(),
                    contract_address: None,
                },
            ])
            .await
            .unwrap();

        let target_block_number = 1_500u64;
        let target_time = 1_700_000_500_000u64;
        let matching_tx = SystemTx {
            internal_hash: B256::repeat_byte(99),
            explorer_hash: B256::repeat_byte(100),
            from: native,
            asset_recipient: recipient,
            amount_smallest_unit: "5000000000000000000".to_owned(),
            contract_address: None,
        };

        let mut blocks = Vec::new();
        for n in (target_block_number.saturating_sub(400))..=(target_block_number + 400) {
            let system_txs = if n == target_block_number { vec![matching_tx.clone()] } else { vec![] };
            blocks.push(BlockData {
                number: n,
                hash: B256::repeat_byte((n % 250) as u8),
                timestamp: 1_700_000_000_000 + (n - 1_000) * 1_000,
                system_txs,
            });
        }
        let fetcher = StubFetcher { blocks };

        let xfer = transfer(target_time, "5.0", recipient, native);
        let finder = Finder::new(BlockAnchor { block_number: 1, block_timestamp: 0 });

        let result = finder.find(&xfer, 18, &index, &fetcher).await.unwrap();
        assert_eq!(result.block_number, target_block_number);
        assert!(result.rounds <= 4, "expected convergence within 4 rounds, got {}", result.rounds);
    }

    #[tokio::test]
    async fn exhaustive_search_reports_not_found() {
        let storage: Arc<dyn Storage> = Arc::new(FakeStorage::new());
        let index = AnchorIndex::new(storage);
        let native = address!("2222222222222222222222222222222222222222");
        let recipient = address!("000000000000000000000000000000000000aa");
        let xfer = transfer(5_000, "1.0", recipient, native);
        let finder = Finder::new(BlockAnchor { block_number: 1, block_timestamp: 0 });
        let fetcher = StubFetcher { blocks: vec![] };

        let err = finder.find(&xfer, 18, &index, &fetcher).await.unwrap_err();
        assert!(matches!(err, FindError::NotFound { .. }));
    }
}
