use alloy_primitives::{Address, B256};
use bridge_errors::StorageError;
use bridge_primitives::{AnchorTx, EvmMatch, Transfer, TransferStatus, WatchedAddress};
use bson::{doc, Bson, Document};
use std::str::FromStr;

/// Field names for the `transfers` collection. Kept as named consts rather
/// than inline string literals since they're referenced from both the
/// document (de)serializers and the index/query builders below.
pub(super) mod transfer_fields {
    pub const CORE_HASH: &str = "coreHash";
    pub const CORE_TIME: &str = "coreTime";
    pub const TOKEN: &str = "token";
    pub const AMOUNT: &str = "amount";
    pub const RECIPIENT: &str = "recipient";
    pub const SYSTEM_ADDRESS: &str = "systemAddress";
    pub const WATCHED_SENDER: &str = "watchedSender";
    pub const USD_VALUE: &str = "usdValue";
    pub const FEE: &str = "fee";
    pub const NATIVE_TOKEN_FEE: &str = "nativeTokenFee";
    pub const STATUS: &str = "status";
    pub const FAIL_REASON: &str = "failReason";
    pub const EVM_INTERNAL_HASH: &str = "evmInternalHash";
    pub const EVM_EXPLORER_HASH: &str = "evmExplorerHash";
    pub const EVM_BLOCK_NUMBER: &str = "evmBlockNumber";
    pub const EVM_BLOCK_HASH: &str = "evmBlockHash";
    pub const EVM_BLOCK_TIME: &str = "evmBlockTime";
    pub const CONTRACT_ADDRESS: &str = "contractAddress";
}

pub(super) mod anchor_fields {
    pub const INTERNAL_HASH: &str = "internalHash";
    pub const EXPLORER_HASH: &str = "explorerHash";
    pub const BLOCK_NUMBER: &str = "blockNumber";
    pub const BLOCK_HASH: &str = "blockHash";
    pub const BLOCK_TIMESTAMP: &str = "blockTimestamp";
    pub const FROM: &str = "from";
    pub const ASSET_RECIPIENT: &str = "assetRecipient";
    pub const AMOUNT_SMALLEST_UNIT: &str = "amountSmallestUnit";
    pub const CONTRACT_ADDRESS: &str = "contractAddress";
}

pub(super) mod watched_fields {
    pub const ADDRESS: &str = "address";
    pub const LAST_INDEXED_TIME: &str = "lastIndexedTime";
    pub const IS_ACTIVE: &str = "isActive";
}

fn ser_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn addr_to_bson(addr: Address) -> Bson {
    Bson::String(format!("{addr:#x}"))
}

fn addr_from_doc(doc: &Document, field: &str) -> Result<Address, StorageError> {
    let s = doc.get_str(field).map_err(ser_err)?;
    Address::from_str(s).map_err(ser_err)
}

fn opt_addr_from_doc(doc: &Document, field: &str) -> Result<Option<Address>, StorageError> {
    match doc.get(field) {
        None | Some(Bson::Null) => Ok(None),
        Some(Bson::String(s)) => Address::from_str(s).map(Some).map_err(ser_err),
        Some(other) => Err(ser_err(format!("unexpected bson type for {field}: {other:?}"))),
    }
}

fn b256_from_doc(doc: &Document, field: &str) -> Result<B256, StorageError> {
    let s = doc.get_str(field).map_err(ser_err)?;
    B256::from_str(s).map_err(ser_err)
}

fn opt_string(doc: &Document, field: &str) -> Option<String> {
    doc.get_str(field).ok().map(str::to_owned)
}

pub(super) fn transfer_to_doc(transfer: &Transfer) -> Document {
    use transfer_fields::*;
    let mut doc = doc! {
        CORE_HASH: &transfer.core_hash,
        CORE_TIME: transfer.core_time as i64,
        TOKEN: &transfer.token,
        AMOUNT: &transfer.amount,
        RECIPIENT: addr_to_bson(transfer.recipient),
        SYSTEM_ADDRESS: addr_to_bson(transfer.system_address),
        WATCHED_SENDER: addr_to_bson(transfer.watched_sender),
        STATUS: status_to_str(transfer.status),
    };
    doc.insert(USD_VALUE, transfer.usd_value.clone().map_or(Bson::Null, Bson::String));
    doc.insert(FEE, transfer.fee.clone().map_or(Bson::Null, Bson::String));
    doc.insert(NATIVE_TOKEN_FEE, transfer.native_token_fee.clone().map_or(Bson::Null, Bson::String));
    doc.insert(FAIL_REASON, transfer.fail_reason.clone().map_or(Bson::Null, Bson::String));
    match &transfer.evm {
        Some(evm) => {
            doc.insert(EVM_INTERNAL_HASH, format!("{:#x}", evm.internal_hash));
            doc.insert(EVM_EXPLORER_HASH, format!("{:#x}", evm.explorer_hash));
            doc.insert(EVM_BLOCK_NUMBER, evm.block_number as i64);
            doc.insert(EVM_BLOCK_HASH, format!("{:#x}", evm.block_hash));
            doc.insert(EVM_BLOCK_TIME, evm.block_time as i64);
            doc.insert(CONTRACT_ADDRESS, evm.contract_address.map_or(Bson::Null, addr_to_bson));
        }
        None => {
            for field in [EVM_INTERNAL_HASH, EVM_EXPLORER_HASH, EVM_BLOCK_NUMBER, EVM_BLOCK_HASH, EVM_BLOCK_TIME, CONTRACT_ADDRESS]
            {
                doc.insert(field, Bson::Null);
            }
        }
    }
    doc
}

pub(super) fn doc_to_transfer(doc: Document) -> Result<Transfer, StorageError> {
    use transfer_fields::*;
    let status = status_from_str(doc.get_str(STATUS).map_err(ser_err)?)?;
    let evm = if status == TransferStatus::Matched {
        Some(EvmMatch {
            internal_hash: b256_from_doc(&doc, EVM_INTERNAL_HASH)?,
            explorer_hash: b256_from_doc(&doc, EVM_EXPLORER_HASH)?,
            block_number: doc.get_i64(EVM_BLOCK_NUMBER).map_err(ser_err)? as u64,
            block_hash: b256_from_doc(&doc, EVM_BLOCK_HASH)?,
            block_time: doc.get_i64(EVM_BLOCK_TIME).map_err(ser_err)? as u64,
            contract_address: opt_addr_from_doc(&doc, CONTRACT_ADDRESS)?,
        })
    } else {
        None
    };
    Ok(Transfer {
        core_hash: doc.get_str(CORE_HASH).map_err(ser_err)?.to_owned(),
        core_time: doc.get_i64(CORE_TIME).map_err(ser_err)? as u64,
        token: doc.get_str(TOKEN).map_err(ser_err)?.to_owned(),
        amount: doc.get_str(AMOUNT).map_err(ser_err)?.to_owned(),
        recipient: addr_from_doc(&doc, RECIPIENT)?,
        system_address: addr_from_doc(&doc, SYSTEM_ADDRESS)?,
        watched_sender: addr_from_doc(&doc, WATCHED_SENDER)?,
        usd_value: opt_string(&doc, USD_VALUE),
        fee: opt_string(&doc, FEE),
        native_token_fee: opt_string(&doc, NATIVE_TOKEN_FEE),
        status,
        fail_reason: opt_string(&doc, FAIL_REASON),
        evm,
    })
}

fn status_to_str(status: TransferStatus) -> &'static str {
    match status {
        TransferStatus::Pending => "PENDING",
        TransferStatus::Matched => "MATCHED",
        TransferStatus::Failed => "FAILED",
    }
}

fn status_from_str(s: &str) -> Result<TransferStatus, StorageError> {
    match s {
        "PENDING" => Ok(TransferStatus::Pending),
        "MATCHED" => Ok(TransferStatus::Matched),
        "FAILED" => Ok(TransferStatus::Failed),
        other => Err(ser_err(format!("unknown transfer status {other:?}"))),
    }
}

pub(super) fn anchor_to_doc(anchor: &AnchorTx) -> Document {
    use anchor_fields::*;
    doc! {
        INTERNAL_HASH: format!("{:#x}", anchor.internal_hash),
        EXPLORER_HASH: format!("{:#x}", anchor.explorer_hash),
        BLOCK_NUMBER: anchor.block_number as i64,
        BLOCK_HASH: format!("{:#x}", anchor.block_hash),
        BLOCK_TIMESTAMP: anchor.block_timestamp as i64,
        FROM: addr_to_bson(anchor.from),
        ASSET_RECIPIENT: addr_to_bson(anchor.asset_recipient),
        AMOUNT_SMALLEST_UNIT: &anchor.amount_smallest_unit,
        CONTRACT_ADDRESS: anchor.contract_address.map_or(Bson::Null, addr_to_bson),
    }
}

pub(super) fn doc_to_anchor(doc: Document) -> Result<AnchorTx, StorageError> {
    use anchor_fields::*;
    Ok(AnchorTx {
        internal_hash: b256_from_doc(&doc, INTERNAL_HASH)?,
        explorer_hash: b256_from_doc(&doc, EXPLORER_HASH)?,
        block_number: doc.get_i64(BLOCK_NUMBER).map_err(ser_err)? as u64,
        block_hash: b256_from_doc(&doc, BLOCK_HASH)?,
        block_timestamp: doc.get_i64(BLOCK_TIMESTAMP).map_err(ser_err)? as u64,
        from: addr_from_doc(&doc, FROM)?,
        asset_recipient: addr_from_doc(&doc, ASSET_RECIPIENT)?,
        amount_smallest_unit: doc.get_str(AMOUNT_SMALLEST_UNIT).map_err(ser_err)?.to_owned(),
        contract_address: opt_addr_from_doc(&doc, CONTRACT_ADDRESS)?,
    })
}

pub(super) fn watched_to_doc(watched: &WatchedAddress) -> Document {
    use watched_fields::*;
    doc! {
        ADDRESS: addr_to_bson(watched.address),
        LAST_INDEXED_TIME: watched.last_indexed_time as i64,
        IS_ACTIVE: watched.is_active,
    }
}

pub(super) fn doc_to_watched(doc: Document) -> Result<WatchedAddress, StorageError> {
    use watched_fields::*;
    Ok(WatchedAddress {
        address: addr_from_doc(&doc, ADDRESS)?,
        last_indexed_time: doc.get_i64(LAST_INDEXED_TIME).map_err(ser_err)? as u64,
        is_active: doc.get_bool(IS_ACTIVE).map_err(ser_err)?,
    })
}
