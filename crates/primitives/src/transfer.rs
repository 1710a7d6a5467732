use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Status of a [`Transfer`]'s correlation lifecycle.
///
/// Transitions only ever go `Pending -> Matched` or `Pending -> Failed`;
/// `Matched` is terminal, `Failed` may be reset back to `Pending` by an
/// external operator action (outside this crate's concern).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferStatus {
    Pending,
    Matched,
    Failed,
}

/// The EVM-side fields of a matched transfer. Present if and only if
/// [`Transfer::status`] is [`TransferStatus::Matched`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmMatch {
    pub internal_hash: B256,
    pub explorer_hash: B256,
    pub block_number: u64,
    pub block_hash: B256,
    pub block_time: u64,
    pub contract_address: Option<Address>,
}

/// A CORE-side spot transfer awaiting, or holding, correlation with its EVM
/// counterpart.
///
/// `core_hash` is the persistence layer's uniqueness key; everything else is
/// either CORE-observed (immutable once inserted) or EVM-observed (written
/// exactly once, by the matcher, on the PENDING -> MATCHED transition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub core_hash: String,
    pub core_time: u64,
    pub token: String,
    pub amount: String,
    pub recipient: Address,
    pub system_address: Address,
    pub watched_sender: Address,
    pub usd_value: Option<String>,
    pub fee: Option<String>,
    pub native_token_fee: Option<String>,
    pub status: TransferStatus,
    pub fail_reason: Option<String>,
    pub evm: Option<EvmMatch>,
}

impl Transfer {
    /// Construct a freshly-indexed transfer in `PENDING` status, as produced
    /// by an indexer worker on first sighting.
    #[allow(clippy::too_many_arguments)]
    pub fn new_pending(
        core_hash: String,
        core_time: u64,
        token: String,
        amount: String,
        recipient: Address,
        system_address: Address,
        watched_sender: Address,
        usd_value: Option<String>,
        fee: Option<String>,
        native_token_fee: Option<String>,
    ) -> Self {
        Self {
            core_hash,
            core_time,
            token,
            amount,
            recipient,
            system_address,
            watched_sender,
            usd_value,
            fee,
            native_token_fee,
            status: TransferStatus::Pending,
            fail_reason: None,
            evm: None,
        }
    }

    /// Transition `PENDING -> MATCHED`, populating the EVM fields. No-op
    /// (returns `false`) if the transfer is not currently pending — callers
    /// that expect idempotent retries should treat that as "already handled".
    pub fn mark_matched(&mut self, evm: EvmMatch) -> bool {
        if self.status != TransferStatus::Pending {
            return false;
        }
        self.evm = Some(evm);
        self.status = TransferStatus::Matched;
        true
    }

    /// Transition `PENDING -> FAILED` with a bounded reason string.
    pub fn mark_failed(&mut self, reason: String) -> bool {
        if self.status != TransferStatus::Pending {
            return false;
        }
        self.fail_reason = Some(reason);
        self.status = TransferStatus::Failed;
        true
    }
}
