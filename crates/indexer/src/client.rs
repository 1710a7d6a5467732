use alloy_primitives::Address;
use bridge_errors::FetchError;
use serde::Deserialize;

/// One entry from the CORE ledger's `userNonFundingLedgerUpdates` feed
/// (spec §6): a timestamped, hashed event, only some of which are spot
/// transfers the indexer cares about.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LedgerEntry {
    pub time: u64,
    pub hash: String,
    pub delta: Delta,
}

/// The tagged union of ledger delta kinds. Only `SpotTransfer` carries the
/// fields the indexer inserts as a [`bridge_primitives::Transfer`]; every
/// other kind is parsed far enough to be skipped without erroring the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum Delta {
    #[serde(rename = "spotTransfer")]
    SpotTransfer {
        token: String,
        amount: String,
        user: Address,
        destination: Address,
        #[serde(rename = "usdcValue")]
        usdc_value: Option<String>,
        fee: Option<String>,
        #[serde(rename = "nativeTokenFee")]
        native_token_fee: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// Thin client over the upstream CORE ledger endpoint (spec §6): a POST
/// with an inclusive-start `startTime` cursor, returning an ascending-by-
/// time page of entries. Mirrors `bridge-assets::AssetMetadataClient`'s
/// shape — a bare `reqwest::Client` plus a base URL, one POST, one JSON
/// body tag.
#[derive(Debug, Clone)]
pub struct CoreLedgerClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoreLedgerClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    /// Fetch the page of ledger updates for `user` starting at (inclusive)
    /// `start_time`. The API may redeliver entries at or after `start_time`
    /// on every call; callers must dedup by insert outcome, not by trusting
    /// the page to be novel.
    pub(crate) async fn fetch_updates(
        &self,
        user: Address,
        start_time: u64,
    ) -> Result<Vec<LedgerEntry>, FetchError> {
        let response = self
            .http
            .post(&self.base_url)
            .json(&serde_json::json!({
                "kind": "userNonFundingLedgerUpdates",
                "user": user,
                "startTime": start_time,
            }))
            .send()
            .await
            .map_err(|e| if e.is_timeout() { FetchError::Timeout(std::time::Duration::from_secs(30)) } else { FetchError::Transient(e.to_string()) })?;

        if response.status().as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(FetchError::RateLimited(std::time::Duration::from_secs(retry_after)));
        }
        if response.status().is_server_error() {
            return Err(FetchError::Transient(format!("CORE ledger endpoint returned {}", response.status())));
        }
        if !response.status().is_success() {
            return Err(FetchError::ProtocolViolation(format!("CORE ledger endpoint returned {}", response.status())));
        }

        response.json().await.map_err(|e| FetchError::ProtocolViolation(e.to_string()))
    }
}
