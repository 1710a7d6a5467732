use alloy_primitives::{Address, B256};
use bridge_primitives::{AnchorTx, EvmMatch};
use std::time::Duration;

/// The successful outcome of [`crate::Finder::find`]: the matched anchor's
/// EVM identifiers plus the search's own statistics. `rounds` and
/// `blocks_searched` are observational — useful for `bridge-metrics` and the
/// stats logger, not an invariant the matcher depends on (spec §9: a
/// `rounds` reading at or above `MAX_ROUNDS` has been observed upstream and
/// is not treated as a bug to reproduce or to guard against here).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindResult {
    pub internal_hash: B256,
    pub explorer_hash: B256,
    pub block_number: u64,
    pub block_hash: B256,
    pub block_time: u64,
    pub contract_address: Option<Address>,
    pub rounds: u32,
    pub blocks_searched: u64,
    pub elapsed: Duration,
}

impl FindResult {
    pub(crate) fn from_anchor(anchor: AnchorTx, rounds: u32, blocks_searched: u64, elapsed: Duration) -> Self {
        Self {
            internal_hash: anchor.internal_hash,
            explorer_hash: anchor.explorer_hash,
            block_number: anchor.block_number,
            block_hash: anchor.block_hash,
            block_time: anchor.block_timestamp,
            contract_address: anchor.contract_address,
            rounds,
            blocks_searched,
            elapsed,
        }
    }

    /// Project into the durable fields `bridge-matcher` writes via
    /// `Storage::mark_matched`.
    pub fn into_evm_match(self) -> EvmMatch {
        EvmMatch {
            internal_hash: self.internal_hash,
            explorer_hash: self.explorer_hash,
            block_number: self.block_number,
            block_hash: self.block_hash,
            block_time: self.block_time,
            contract_address: self.contract_address,
        }
    }
}
