use alloy_primitives::Address;
use bridge_errors::FetchError;
use serde::Deserialize;

/// Decimals assumed for a system address the cache has never seen and a
/// refresh didn't resolve either.
pub const DEFAULT_EVM_DECIMALS: u32 = 18;

#[derive(Debug, Deserialize)]
struct TokensResponse {
    tokens: Vec<TokenEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenEntry {
    pub name: String,
    pub index: u16,
    #[serde(rename = "weiDecimals")]
    pub wei_decimals: u32,
    #[serde(rename = "evmContract")]
    pub evm_contract: Option<EvmContractEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EvmContractEntry {
    pub address: Address,
    #[serde(rename = "evm_extra_wei_decimals")]
    pub evm_extra_wei_decimals: u32,
}

/// Thin client over the upstream asset-metadata endpoint (spec §6): a POST
/// with no body returning the full token list.
#[derive(Debug, Clone)]
pub struct AssetMetadataClient {
    http: reqwest::Client,
    base_url: String,
}

impl AssetMetadataClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    pub(crate) async fn fetch_tokens(&self) -> Result<Vec<TokenEntry>, FetchError> {
        let response = self
            .http
            .post(&self.base_url)
            .json(&serde_json::json!({ "type": "metaAndAssetCtxs" }))
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        if response.status().as_u16() == 429 {
            return Err(FetchError::RateLimited(std::time::Duration::from_secs(60)));
        }
        if !response.status().is_success() {
            return Err(FetchError::Transient(format!("asset metadata endpoint returned {}", response.status())));
        }

        let parsed: TokensResponse =
            response.json().await.map_err(|e| FetchError::ProtocolViolation(e.to_string()))?;
        Ok(parsed.tokens)
    }
}
