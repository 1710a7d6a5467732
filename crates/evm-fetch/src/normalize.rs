use crate::abi::IERC20::transferCall;
use crate::hash::{compute_hashes, TxFields};
use crate::model::RawTx;
use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use bridge_primitives::SystemTx;

/// Normalize one raw transaction into a [`SystemTx`], or `None` if it isn't
/// a system transfer this bridge cares about (spec §4.C normalization
/// rules). Identical logic for both fetcher variants.
///
/// - **Native transfer**: empty input, `value > 0`. `from` is the native
///   system address; `assetRecipient` is the tx's `to`; `contractAddress`
///   is `None`.
/// - **Contract transfer**: input begins with the ERC-20 transfer selector
///   and decodes to `(to, amount)`. `from` is recovered from the first
///   matching `Transfer` event log's indexed sender topic; a transaction
///   with no such log is skipped (it can't be attributed to a sender).
pub fn normalize_tx(tx: &RawTx, chain_id: u64, native_system_address: Address) -> Option<SystemTx> {
    if tx.input.is_empty() && !tx.value.is_zero() {
        let to = tx.to?;
        let fields = TxFields {
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: tx.to,
            value: tx.value,
            input: tx.input.clone(),
        };
        let (internal_hash, explorer_hash) = compute_hashes(&fields, chain_id, native_system_address);
        return Some(SystemTx {
            internal_hash,
            explorer_hash,
            from: native_system_address,
            asset_recipient: to,
            amount_smallest_unit: tx.value.to_string(),
            contract_address: None,
        });
    }

    let (decoded_to, amount) = decode_erc20_transfer(&tx.input)?;
    let contract = tx.to?;
    let log = tx.transfer_logs.iter().find(|log| log.contract == contract && log.to == decoded_to)?;

    let fields = TxFields {
        nonce: tx.nonce,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        to: tx.to,
        value: tx.value,
        input: tx.input.clone(),
    };
    let (internal_hash, explorer_hash) = compute_hashes(&fields, chain_id, log.from);
    Some(SystemTx {
        internal_hash,
        explorer_hash,
        from: log.from,
        asset_recipient: decoded_to,
        amount_smallest_unit: amount.to_string(),
        contract_address: Some(contract),
    })
}

fn decode_erc20_transfer(input: &[u8]) -> Option<(Address, alloy_primitives::U256)> {
    let call = transferCall::abi_decode(input, true).ok()?;
    Some((call.to, call.amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransferLog;
    use alloy_primitives::{address, Bytes, U256};

    fn native_tx(to: Address, value: u64) -> RawTx {
        RawTx { nonce: 0, gas_price: U256::from(1u64), gas_limit: 21_000, to: Some(to), value: U256::from(value), input: Bytes::new(), transfer_logs: vec![] }
    }

    #[test]
    fn native_transfer_uses_native_system_address() {
        let native = address!("2222222222222222222222222222222222222222");
        let recipient = address!("000000000000000000000000000000000000aa");
        let tx = native_tx(recipient, 1_000_000_000_000_000_000);
        let system_tx = normalize_tx(&tx, 1, native).unwrap();
        assert_eq!(system_tx.from, native);
        assert_eq!(system_tx.asset_recipient, recipient);
        assert_eq!(system_tx.contract_address, None);
    }

    #[test]
    fn zero_value_empty_input_is_not_a_transfer() {
        let native = address!("2222222222222222222222222222222222222222");
        let tx = native_tx(address!("000000000000000000000000000000000000aa"), 0);
        assert!(normalize_tx(&tx, 1, native).is_none());
    }

    #[test]
    fn contract_transfer_without_matching_log_is_skipped() {
        let native = address!("2222222222222222222222222222222222222222");
        let contract = address!("00000000000000000000000000000000000ccc");
        let to = address!("000000000000000000000000000000000000aa");
        let input = transferCall { to, amount: U256::from(42u64) }.abi_encode();
        let tx = RawTx {
            nonce: 0,
            gas_price: U256::from(1u64),
            gas_limit: 60_000,
            to: Some(contract),
            value: U256::ZERO,
            input: Bytes::from(input),
            transfer_logs: vec![],
        };
        assert!(normalize_tx(&tx, 1, native).is_none());
    }

    #[test]
    fn contract_transfer_with_matching_log_resolves_sender() {
        let native = address!("2222222222222222222222222222222222222222");
        let contract = address!("00000000000000000000000000000000000ccc");
        let sender = address!("2000000000000000000000000000000000000a");
        let to = address!("000000000000000000000000000000000000aa");
        let input = transferCall { to, amount: U256::from(42u64) }.abi_encode();
        let tx = RawTx {
            nonce: 0,
            gas_price: U256::from(1u64),
            gas_limit: 60_000,
            to: Some(contract),
            value: U256::ZERO,
            input: Bytes::from(input),
            transfer_logs: vec![TransferLog { contract, from: sender, to }],
        };
        let system_tx = normalize_tx(&tx, 1, native).unwrap();
        assert_eq!(system_tx.from, sender);
        assert_eq!(system_tx.asset_recipient, to);
        assert_eq!(system_tx.contract_address, Some(contract));
        assert_eq!(system_tx.amount_smallest_unit, "42");
    }
}
