use crate::abi::IERC20::Transfer as TransferEvent;
use crate::model::{RawTx, TransferLog};
use crate::{normalize_tx, sort_by_number, BlockFetcher};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use bridge_errors::FetchError;
use bridge_primitives::BlockData;
use bridge_tasks::{jittered_backoff, retry_with_backoff, BackoffCoordinator};
use futures::future::try_join_all;
use serde::Deserialize;
use std::time::{Duration, SystemTime};

/// Credentials and bucket location for the paid, "requester pays" object
/// store that serves per-block records.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Overrides the default `https://{bucket}.s3.{region}.amazonaws.com`
    /// host, for S3-compatible endpoints.
    pub endpoint: Option<String>,
    /// Object key file extension (e.g. `"mpk"`).
    pub extension: String,
}

impl ObjectStoreConfig {
    fn base_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region))
    }
}

/// The paid, fast provider: fetches one object per requested block at a
/// deterministic path, with unbounded concurrency across the requested
/// blocks within a single call (the RPC variant is capped at
/// concurrency = 1; this one is not, since it's the backfill-throughput
/// path).
#[derive(Debug)]
pub struct ObjectStoreFetcher {
    http: reqwest::Client,
    config: ObjectStoreConfig,
    chain_id: u64,
    native_system_address: Address,
    backoff: BackoffCoordinator,
    retry_attempts: usize,
}

impl ObjectStoreFetcher {
    pub fn new(
        http: reqwest::Client,
        config: ObjectStoreConfig,
        chain_id: u64,
        native_system_address: Address,
        backoff: BackoffCoordinator,
        retry_attempts: usize,
    ) -> Self {
        Self { http, config, chain_id, native_system_address, backoff, retry_attempts }
    }

    fn object_path(&self, block_number: u64) -> String {
        let million = block_number / 1_000_000;
        let thousand = (block_number / 1_000) % 1_000;
        format!("{million}/{thousand}/{block_number}.{}", self.config.extension)
    }

    async fn fetch_one(&self, block_number: u64) -> Result<BlockData, FetchError> {
        self.backoff.wait().await;
        let schedule = jittered_backoff(Duration::from_millis(250), self.retry_attempts);
        retry_with_backoff("evm-fetch::object-store", schedule, || async { self.fetch_one_attempt(block_number).await }).await
    }

    async fn fetch_one_attempt(&self, block_number: u64) -> Result<BlockData, FetchError> {
        let url = format!("{}/{}", self.config.base_url(), self.object_path(block_number));
        let request = self.sign_get(&url)?;

        let response = self.http.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(Duration::from_secs(30))
            } else {
                FetchError::Transient(e.to_string())
            }
        })?;

        match response.status().as_u16() {
            429 => {
                let retry_after = Duration::from_secs(60);
                self.backoff.trigger(retry_after);
                return Err(FetchError::RateLimited(retry_after));
            }
            500..=599 => return Err(FetchError::Transient(format!("object store returned {}", response.status()))),
            200 => {}
            other => return Err(FetchError::ProtocolViolation(format!("object store returned {other}"))),
        }

        let compressed = response.bytes().await.map_err(|e| FetchError::Transient(e.to_string()))?;
        let mut packed = Vec::new();
        std::io::Read::read_to_end(&mut lz4_flex::frame::FrameDecoder::new(compressed.as_ref()), &mut packed)
            .map_err(|e| FetchError::ProtocolViolation(format!("lz4 frame decode: {e}")))?;
        let record: BlockRecord = rmp_serde::from_slice(&packed).map_err(|e| FetchError::ProtocolViolation(e.to_string()))?;
        parse_record(block_number, record, self.chain_id, self.native_system_address)
    }

    fn sign_get(&self, url: &str) -> Result<reqwest::Request, FetchError> {
        let identity = Credentials::new(
            &self.config.access_key_id,
            &self.config.secret_access_key,
            None,
            None,
            "bridge-correlator",
        )
        .into();
        let signing_params: v4::SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.config.region)
            .name("s3")
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| FetchError::ProtocolViolation(format!("sigv4 signing params: {e}")))?
            .into();

        let headers = [("x-amz-request-payer", "requester")];
        let signable = SignableRequest::new(
            "GET",
            url,
            headers.iter().map(|(k, v)| (*k, *v)),
            SignableBody::Bytes(&[]),
        )
        .map_err(|e| FetchError::ProtocolViolation(format!("sigv4 signable request: {e}")))?;

        let (instructions, _signature) = sign(signable, &signing_params)
            .map_err(|e| FetchError::ProtocolViolation(format!("sigv4 sign: {e}")))?
            .into_parts();

        let mut builder = self.http.get(url).header("x-amz-request-payer", "requester");
        for header in instructions.headers() {
            builder = builder.header(header.0, header.1);
        }
        builder.build().map_err(|e| FetchError::ProtocolViolation(e.to_string()))
    }
}

#[async_trait]
impl BlockFetcher for ObjectStoreFetcher {
    async fn fetch_blocks(&self, block_numbers: &[u64]) -> Result<Vec<BlockData>, FetchError> {
        let futures = block_numbers.iter().map(|&n| self.fetch_one(n));
        let blocks = try_join_all(futures).await?;
        Ok(sort_by_number(blocks))
    }

    fn name(&self) -> &'static str {
        "object-store"
    }
}

/// Mirrors the chain's own block encoding, so `timestamp` is seconds like
/// the RPC provider's `eth_getBlockByNumber` — converted to milliseconds in
/// [`parse_record`] to agree with every other timestamp in the system.
#[derive(Debug, Deserialize)]
struct BlockRecord {
    number: u64,
    hash: B256,
    timestamp: u64,
    transactions: Vec<TxRecord>,
}

#[derive(Debug, Deserialize)]
struct TxRecord {
    nonce: u64,
    gas_price: U256,
    gas_limit: u64,
    to: Option<Address>,
    value: U256,
    input: Bytes,
    #[serde(default)]
    logs: Vec<LogRecord>,
}

#[derive(Debug, Deserialize)]
struct LogRecord {
    address: Address,
    topics: Vec<B256>,
}

fn parse_record(
    expected_number: u64,
    record: BlockRecord,
    chain_id: u64,
    native_system_address: Address,
) -> Result<BlockData, FetchError> {
    if record.number != expected_number {
        return Err(FetchError::ProtocolViolation(format!(
            "requested block {expected_number} but object store returned {}",
            record.number
        )));
    }

    let mut system_txs = Vec::new();
    for tx in record.transactions {
        let transfer_logs = tx
            .logs
            .iter()
            .filter(|log| log.topics.len() >= 3 && log.topics[0] == TransferEvent::SIGNATURE_HASH)
            .map(|log| TransferLog {
                contract: log.address,
                from: Address::from_slice(&log.topics[1].0[12..]),
                to: Address::from_slice(&log.topics[2].0[12..]),
            })
            .collect();
        let raw = RawTx {
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: tx.to,
            value: tx.value,
            input: tx.input,
            transfer_logs,
        };
        if let Some(system_tx) = normalize_tx(&raw, chain_id, native_system_address) {
            system_txs.push(system_tx);
        }
    }

    Ok(BlockData { number: record.number, hash: record.hash, timestamp: record.timestamp * 1_000, system_txs })
}
