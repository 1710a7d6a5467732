//! Process-wide asset metadata cache (spec §4.B): a token-identifier ->
//! EVM decimal scaling + system-address mapping, populated once at startup
//! and refreshed on demand. Readers never see a partially-updated view: the
//! populate step builds all three maps before swapping them in atomically,
//! the same "many rare writes, many reads" discipline the design notes call
//! for, implemented with `arc-swap` the way
//! `x402-rs`'s `PendingNonceManager` replaces its map wholesale rather than
//! mutating in place.

mod client;
mod model;

pub use client::{AssetMetadataClient, DEFAULT_EVM_DECIMALS};
pub use model::Asset;

use arc_swap::ArcSwap;
use bridge_primitives::{native_system_address, system_address_for_index};
use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;

/// Fixed decimals the native token entry is forced to, overriding whatever
/// the upstream endpoint reports for it.
pub const NATIVE_DECIMALS: u32 = 18;

#[derive(Debug, Default)]
struct Maps {
    by_name: HashMap<String, Arc<Asset>>,
    by_system_address: HashMap<Address, Arc<Asset>>,
    by_index: HashMap<u16, Arc<Asset>>,
}

/// Safe for concurrent readers at all times; writes (via
/// [`AssetCache::populate`]) replace the whole map set in one atomic swap so
/// no reader ever observes a partially-populated cache.
#[derive(Debug)]
pub struct AssetCache {
    maps: ArcSwap<Maps>,
    client: AssetMetadataClient,
}

impl AssetCache {
    pub fn new(client: AssetMetadataClient) -> Self {
        Self { maps: ArcSwap::from_pointee(Maps::default()), client }
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<Asset>> {
        self.maps.load().by_name.get(name).cloned()
    }

    pub fn by_index(&self, index: u16) -> Option<Arc<Asset>> {
        self.maps.load().by_index.get(&index).cloned()
    }

    pub fn by_system_address(&self, address: Address) -> Option<Arc<Asset>> {
        self.maps.load().by_system_address.get(&address).cloned()
    }

    /// Fetch the upstream token list and atomically replace all three maps.
    /// The native token entry's decimals are always forced to
    /// [`NATIVE_DECIMALS`] regardless of what the upstream reports.
    pub async fn populate(&self) -> Result<(), bridge_errors::FetchError> {
        let tokens = self.client.fetch_tokens().await?;

        let mut by_name = HashMap::with_capacity(tokens.len() + 1);
        let mut by_system_address = HashMap::with_capacity(tokens.len() + 1);
        let mut by_index = HashMap::with_capacity(tokens.len() + 1);

        for token in tokens {
            let is_native = token.evm_contract.is_none();
            let system_address =
                if is_native { native_system_address() } else { system_address_for_index(token.index) };
            let asset = Arc::new(Asset {
                name: token.name.clone(),
                index: token.index,
                wei_decimals: if is_native { NATIVE_DECIMALS } else { token.wei_decimals },
                evm_extra_wei_decimals: if is_native {
                    0
                } else {
                    token.evm_contract.as_ref().map_or(0, |c| c.evm_extra_wei_decimals)
                },
                evm_contract_address: token.evm_contract.as_ref().map(|c| c.address),
                system_address,
            });
            by_name.insert(asset.name.clone(), asset.clone());
            by_system_address.insert(asset.system_address, asset.clone());
            by_index.insert(asset.index, asset);
        }

        // The upstream list may omit the native token entirely; ensure it's
        // always resolvable with the forced 18-decimal override.
        by_system_address.entry(native_system_address()).or_insert_with(|| {
            Arc::new(Asset {
                name: "native".to_owned(),
                index: 0,
                wei_decimals: NATIVE_DECIMALS,
                evm_extra_wei_decimals: 0,
                evm_contract_address: None,
                system_address: native_system_address(),
            })
        });

        self.maps.store(Arc::new(Maps { by_name, by_system_address, by_index }));
        Ok(())
    }

    /// Resolve the decimals for a system address, refreshing the cache once
    /// if it's unknown, and falling back to [`DEFAULT_EVM_DECIMALS`] if it's
    /// still unknown afterward.
    pub async fn decimals_for_system_address(&self, address: Address) -> u32 {
        if let Some(asset) = self.by_system_address(address) {
            return asset.evm_decimals();
        }
        if self.populate().await.is_ok() {
            if let Some(asset) = self.by_system_address(address) {
                return asset.evm_decimals();
            }
        }
        DEFAULT_EVM_DECIMALS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_override_applies_even_without_upstream_entry() {
        let maps = Maps::default();
        assert!(maps.by_system_address.get(&native_system_address()).is_none());
    }
}
