use alloy_primitives::Address;
use std::str::FromStr;

/// Fixed system address for the native token: twenty bytes of `0x22`.
pub fn native_system_address() -> Address {
    Address::from_str("0x2222222222222222222222222222222222222222")
        .expect("native system address literal is valid")
}

/// System address for a non-native token at asset index `index`: the prefix
/// `0x2000…000` with the low three hex digits replaced by `index` (lowercase,
/// zero-padded). Matches the upstream asset-metadata endpoint's index
/// assignment — e.g. index `0` -> `0x2000…000`, `222` -> `0x2000…0de`.
pub fn system_address_for_index(index: u16) -> Address {
    let mut hex = String::with_capacity(40);
    hex.push('2');
    hex.push_str(&"0".repeat(36));
    hex.push_str(&format!("{index:03x}"));
    debug_assert_eq!(hex.len(), 40);
    Address::from_str(&format!("0x{hex}")).expect("derived system address hex is always 40 digits")
}

/// Whether `address` has the fixed system-address shape (spec §6): either
/// the all-`0x22` native address, or the `0x2000…` prefix with an arbitrary
/// three-hex-digit index in the low bytes. Used by the indexer to filter
/// ledger deltas to the ones that materialize on the EVM chain.
pub fn is_system_address(address: Address) -> bool {
    if address == native_system_address() {
        return true;
    }
    let hex = format!("{address:x}");
    hex.len() == 40 && hex.starts_with('2') && hex[1..37] == "0".repeat(36)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(index: u16) -> Address {
        let hex = format!("2{}{index:03x}", "0".repeat(36));
        Address::from_str(&format!("0x{hex}")).unwrap()
    }

    #[test]
    fn native_address_is_all_twos() {
        assert_eq!(
            native_system_address(),
            Address::from_str("0x2222222222222222222222222222222222222222").unwrap()
        );
    }

    #[test]
    fn index_derivation_matches_spec_examples() {
        for index in [0u16, 5, 222, 268] {
            assert_eq!(system_address_for_index(index), expected(index), "index {index}");
        }
    }

    #[test]
    fn index_two_hundred_sixty_eight_ends_in_10c() {
        // 268 = 0x10c.
        let addr = system_address_for_index(268);
        assert!(format!("{addr:x}").ends_with("10c"));
    }

    #[test]
    fn recognizes_native_and_derived_system_addresses() {
        assert!(is_system_address(native_system_address()));
        assert!(is_system_address(system_address_for_index(0)));
        assert!(is_system_address(system_address_for_index(268)));
        assert!(!is_system_address(Address::ZERO));
        assert!(!is_system_address(Address::from_str("0x000000000000000000000000000000000000aa").unwrap()));
    }
}
