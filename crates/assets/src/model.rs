use alloy_primitives::Address;

/// A resolved asset: the upstream token's decimal scaling plus the derived
/// system address a CORE-side transfer's `systemAddress` field is compared
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub index: u16,
    pub wei_decimals: u32,
    pub evm_extra_wei_decimals: u32,
    pub evm_contract_address: Option<Address>,
    pub system_address: Address,
}

impl Asset {
    /// `weiDecimals + evmExtraWeiDecimals`, the scale `parseAmount` uses to
    /// turn a human-scale decimal string into a smallest-unit integer.
    pub const fn evm_decimals(&self) -> u32 {
        self.wei_decimals + self.evm_extra_wei_decimals
    }

    pub const fn is_native(&self) -> bool {
        self.evm_contract_address.is_none()
    }
}
