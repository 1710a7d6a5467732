use alloy_primitives::Address;

/// Configuration and progress cursor for a single indexer worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedAddress {
    pub address: Address,
    /// Millisecond high-water-mark; `0` means "index from the beginning".
    pub last_indexed_time: u64,
    pub is_active: bool,
}

impl WatchedAddress {
    pub const fn new(address: Address) -> Self {
        Self { address, last_indexed_time: 0, is_active: true }
    }
}
