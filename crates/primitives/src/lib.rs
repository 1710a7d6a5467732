//! Shared data model for `bridge-correlator`: the durable entities persisted
//! by `bridge-storage` and the transient records produced by `bridge-evm-fetch`.
//!
//! This crate carries no business logic — it is the common vocabulary every
//! other crate in the workspace builds on, the same role `reth-primitives`
//! plays for the node's execution crates.

mod amount;
mod anchor;
mod system_address;
mod transfer;
mod watched_address;

pub use amount::{parse_amount, AmountParseError};
pub use anchor::{AnchorTx, BlockAnchor, BracketingAnchors};
pub use system_address::{is_system_address, native_system_address, system_address_for_index};
pub use transfer::{EvmMatch, Transfer, TransferStatus};
pub use watched_address::WatchedAddress;

use alloy_primitives::{Address, B256};

/// A block fetched from either provider in `bridge-evm-fetch`, normalized to
/// the fields the finder and anchor index need. Transient — never persisted
/// as-is; its `SystemTx` entries become `AnchorTx` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockData {
    pub number: u64,
    pub hash: B256,
    pub timestamp: u64,
    pub system_txs: Vec<SystemTx>,
}

/// A normalized asset-transfer extracted from a block, hiding whether the
/// underlying transaction was a native-value transfer or an ERC-20 `transfer`
/// call. Matching logic only ever looks at these five fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTx {
    pub internal_hash: B256,
    pub explorer_hash: B256,
    pub from: Address,
    pub asset_recipient: Address,
    pub amount_smallest_unit: String,
    pub contract_address: Option<Address>,
}

impl SystemTx {
    /// Project this transient transaction into a durable anchor row, stamping
    /// the block it was observed in.
    pub fn into_anchor(self, block_number: u64, block_hash: B256, block_timestamp: u64) -> AnchorTx {
        AnchorTx {
            internal_hash: self.internal_hash,
            explorer_hash: self.explorer_hash,
            block_number,
            block_hash,
            block_timestamp,
            from: self.from,
            asset_recipient: self.asset_recipient,
            amount_smallest_unit: self.amount_smallest_unit,
            contract_address: self.contract_address,
        }
    }
}
