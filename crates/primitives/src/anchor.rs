use alloy_primitives::{Address, B256};

/// A system transaction observed in an EVM block, persisted idempotently and
/// never mutated afterward. Serves double duty: a correlation-cache entry
/// (matched against by `from`/`asset_recipient`/`amount_smallest_unit`) and a
/// timestamp-to-block anchor for the finder's interpolation search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorTx {
    pub internal_hash: B256,
    pub explorer_hash: B256,
    pub block_number: u64,
    pub block_hash: B256,
    pub block_timestamp: u64,
    pub from: Address,
    pub asset_recipient: Address,
    pub amount_smallest_unit: String,
    pub contract_address: Option<Address>,
}

impl AnchorTx {
    /// The three-field tuple that uniquely identifies a transfer across both
    /// ledgers (the "match predicate" of the finder).
    pub fn match_key(&self) -> (Address, Address, &str) {
        (self.from, self.asset_recipient, self.amount_smallest_unit.as_str())
    }

    /// Projection used by `FindBracketingAnchors`: just enough to drive the
    /// finder's interpolation without hauling the full row across the wire.
    pub const fn as_bracket(&self) -> BlockAnchor {
        BlockAnchor { block_number: self.block_number, block_timestamp: self.block_timestamp }
    }
}

/// A `{blockNumber, blockTimestamp}` projection of an anchor, as returned by
/// `FindBracketingAnchors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAnchor {
    pub block_number: u64,
    pub block_timestamp: u64,
}

/// The pair of bracketing anchors around a target timestamp: the greatest
/// anchor at or before it, and the least strictly after it. Either side may
/// be absent (empty store, or target beyond all known anchors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BracketingAnchors {
    pub before: Option<BlockAnchor>,
    pub after: Option<BlockAnchor>,
}
