use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{BufMut, Encodable, Header};

/// The fields of a legacy (pre-EIP-155-extension) transaction that are
/// common to both of a system transaction's two hashes; only `v`, `r`, `s`
/// differ between the internal and explorer hash.
#[derive(Debug, Clone)]
pub struct TxFields {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

/// The two bridge identifier hashes for a system transaction: Keccak-256 of
/// the canonical RLP encoding of `fields`, once with a "null" signature
/// (`v = chainId*2+35, r=0, s=0`) and once with a signature that embeds the
/// sending system address (`v = chainId*2+36, r=1, s=<system address>`).
/// Block explorers display the latter; internal lookups use the former.
/// These must be byte-exact with the upstream system's own computation, so
/// the encoding is built field-by-field rather than through a higher-level
/// transaction-envelope type.
pub fn compute_hashes(fields: &TxFields, chain_id: u64, sender_system_address: Address) -> (B256, B256) {
    let internal = encode_and_hash(fields, chain_id * 2 + 35, U256::ZERO, U256::ZERO);
    let explorer_s = U256::from_be_slice(sender_system_address.as_slice());
    let explorer = encode_and_hash(fields, chain_id * 2 + 36, U256::from(1u64), explorer_s);
    (internal, explorer)
}

fn encode_and_hash(fields: &TxFields, v: u64, r: U256, s: U256) -> B256 {
    let mut payload = Vec::new();
    fields.nonce.encode(&mut payload);
    fields.gas_price.encode(&mut payload);
    fields.gas_limit.encode(&mut payload);
    encode_to(&mut payload, fields.to);
    fields.value.encode(&mut payload);
    fields.input.encode(&mut payload);
    v.encode(&mut payload);
    r.encode(&mut payload);
    s.encode(&mut payload);

    let header = Header { list: true, payload_length: payload.len() };
    let mut out = Vec::with_capacity(header.length() + payload.len());
    header.encode(&mut out);
    out.put_slice(&payload);

    keccak256(out)
}

/// RLP-encodes the transaction's `to` field: the 20-byte address string, or
/// the empty string (`0x80`) for a contract-creation transaction. System
/// transactions are never contract creations, but the empty-string case is
/// kept for completeness of the encoding rule.
fn encode_to(out: &mut Vec<u8>, to: Option<Address>) {
    match to {
        Some(address) => address.encode(out),
        None => out.put_u8(0x80),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn internal_and_explorer_hashes_differ_only_in_signature() {
        let fields = TxFields {
            nonce: 1,
            gas_price: U256::from(1_000_000_000u64),
            gas_limit: 21_000,
            to: Some(address!("0000000000000000000000000000000000dEaD")),
            value: U256::from(100u64),
            input: Bytes::new(),
        };
        let (internal, explorer) =
            compute_hashes(&fields, 1, address!("2222222222222222222222222222222222222222"));
        assert_ne!(internal, explorer);
    }

    #[test]
    fn hash_is_deterministic() {
        let fields = TxFields {
            nonce: 7,
            gas_price: U256::from(1u64),
            gas_limit: 21_000,
            to: None,
            value: U256::ZERO,
            input: Bytes::from_static(b"\x01\x02"),
        };
        let sender = address!("2000000000000000000000000000000000000a");
        let (a1, b1) = compute_hashes(&fields, 42, sender);
        let (a2, b2) = compute_hashes(&fields, 42, sender);
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
    }
}
