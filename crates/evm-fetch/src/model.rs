use alloy_primitives::{Address, Bytes, U256};

/// A single ERC-20 `Transfer(address indexed from, address indexed to,
/// uint256 value)` log emitted by a transaction, already topic-decoded.
/// Used only to recover a contract transfer's `from`, which a `transfer()`
/// call's input data does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLog {
    pub contract: Address,
    pub from: Address,
    pub to: Address,
}

/// A transaction as read off either provider, before normalization:
/// everything [`crate::hash::compute_hashes`] needs plus whatever
/// [`crate::normalize::normalize_tx`] needs to classify it as a native or
/// contract transfer.
#[derive(Debug, Clone)]
pub struct RawTx {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    /// Transfer logs emitted by this transaction, if any (contract
    /// transfers only; native transfers emit none).
    pub transfer_logs: Vec<TransferLog>,
}

/// A fetched block, before normalization collapses its transactions down to
/// the five-field [`bridge_primitives::SystemTx`] shape.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub number: u64,
    pub hash: alloy_primitives::B256,
    pub timestamp: u64,
    pub transactions: Vec<RawTx>,
}
