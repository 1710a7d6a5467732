use crate::abi::IERC20::Transfer as TransferEvent;
use crate::model::{RawTx, TransferLog};
use crate::{normalize_tx, sort_by_number, BlockFetcher, RPC_MAX_BLOCKS_PER_BATCH};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use bridge_errors::FetchError;
use bridge_primitives::BlockData;
use bridge_tasks::{jittered_backoff, retry_with_backoff, BackoffCoordinator};
use jsonrpsee::core::client::{BatchResponse, ClientT};
use jsonrpsee::core::params::BatchRequestBuilder;
use jsonrpsee::http_client::HttpClient;
use jsonrpsee::rpc_params;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// The free, slower provider: batches `eth_getBlockByNumber` +
/// `eth_getSystemTxsByBlockNumber` pairs, sequentially chunked
/// (concurrency = 1), with jittered-exponential retry on transient errors.
#[derive(Debug)]
pub struct RpcFetcher {
    client: HttpClient,
    chain_id: u64,
    native_system_address: Address,
    backoff: BackoffCoordinator,
    retry_attempts: usize,
}

impl RpcFetcher {
    pub fn new(
        client: HttpClient,
        chain_id: u64,
        native_system_address: Address,
        backoff: BackoffCoordinator,
        retry_attempts: usize,
    ) -> Self {
        Self { client, chain_id, native_system_address, backoff, retry_attempts }
    }

    async fn fetch_chunk(&self, chunk: &[u64]) -> Result<Vec<BlockData>, FetchError> {
        self.backoff.wait().await;

        let schedule = jittered_backoff(Duration::from_millis(250), self.retry_attempts);
        let chain_id = self.chain_id;
        let native = self.native_system_address;
        let client = &self.client;

        retry_with_backoff("evm-fetch::rpc", schedule, || async {
            let mut batch = BatchRequestBuilder::new();
            for &number in chunk {
                let hex = format!("0x{number:x}");
                batch
                    .insert("eth_getBlockByNumber", rpc_params![hex.clone(), false])
                    .map_err(|e| FetchError::ProtocolViolation(e.to_string()))?;
                batch
                    .insert("eth_getSystemTxsByBlockNumber", rpc_params![hex])
                    .map_err(|e| FetchError::ProtocolViolation(e.to_string()))?;
            }

            let response: BatchResponse<'_, Value> = match client.batch_request(batch).await {
                Ok(response) => response,
                Err(error) => {
                    let classified = classify_rpc_error(error);
                    if let FetchError::RateLimited(retry_after) = classified {
                        self.backoff.trigger(retry_after);
                    }
                    return Err(classified);
                }
            };

            let mut blocks = Vec::with_capacity(chunk.len());
            let mut results = response.into_iter();
            for &number in chunk {
                let block_json = results
                    .next()
                    .ok_or_else(|| FetchError::ProtocolViolation("missing eth_getBlockByNumber result".into()))?
                    .map_err(|e| FetchError::ProtocolViolation(e.to_string()))?;
                let system_txs_json = results
                    .next()
                    .ok_or_else(|| {
                        FetchError::ProtocolViolation("missing eth_getSystemTxsByBlockNumber result".into())
                    })?
                    .map_err(|e| FetchError::ProtocolViolation(e.to_string()))?;

                blocks.push(parse_block(number, block_json, system_txs_json, chain_id, native)?);
            }
            Ok(blocks)
        })
        .await
    }
}

#[async_trait]
impl BlockFetcher for RpcFetcher {
    async fn fetch_blocks(&self, block_numbers: &[u64]) -> Result<Vec<BlockData>, FetchError> {
        let mut out = Vec::with_capacity(block_numbers.len());
        for chunk in block_numbers.chunks(RPC_MAX_BLOCKS_PER_BATCH) {
            out.extend(self.fetch_chunk(chunk).await?);
        }
        Ok(sort_by_number(out))
    }

    fn name(&self) -> &'static str {
        "rpc"
    }
}

fn classify_rpc_error(err: jsonrpsee::core::ClientError) -> FetchError {
    match &err {
        jsonrpsee::core::ClientError::RequestTimeout => FetchError::Timeout(Duration::from_secs(30)),
        jsonrpsee::core::ClientError::Call(call) if call.code() == 429 => {
            FetchError::RateLimited(Duration::from_secs(60))
        }
        jsonrpsee::core::ClientError::Transport(_) => FetchError::Transient(err.to_string()),
        _ => FetchError::ProtocolViolation(err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct BlockJson {
    number: String,
    hash: B256,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct SystemTxJson {
    nonce: String,
    #[serde(rename = "gasPrice")]
    gas_price: String,
    gas: String,
    to: Option<Address>,
    value: String,
    input: Bytes,
    #[serde(default)]
    logs: Vec<LogJson>,
}

#[derive(Debug, Deserialize)]
struct LogJson {
    address: Address,
    topics: Vec<B256>,
}

fn parse_hex_u64(s: &str) -> Result<u64, FetchError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| FetchError::ProtocolViolation(format!("invalid hex u64 {s:?}: {e}")))
}

fn parse_hex_u256(s: &str) -> Result<U256, FetchError> {
    U256::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| FetchError::ProtocolViolation(format!("invalid hex u256 {s:?}: {e}")))
}

fn parse_block(
    number: u64,
    block_json: Value,
    system_txs_json: Value,
    chain_id: u64,
    native_system_address: Address,
) -> Result<BlockData, FetchError> {
    let block: BlockJson =
        serde_json::from_value(block_json).map_err(|e| FetchError::ProtocolViolation(e.to_string()))?;
    let txs: Vec<SystemTxJson> =
        serde_json::from_value(system_txs_json).map_err(|e| FetchError::ProtocolViolation(e.to_string()))?;

    let block_number = parse_hex_u64(&block.number)?;
    if block_number != number {
        return Err(FetchError::ProtocolViolation(format!(
            "requested block {number} but RPC returned {block_number}"
        )));
    }
    // `eth_getBlockByNumber` reports `timestamp` in seconds; every timestamp
    // elsewhere in this system (`Transfer.core_time`, `AnchorTx.block_timestamp`,
    // the finder's cache window) is milliseconds.
    let timestamp = parse_hex_u64(&block.timestamp)? * 1_000;

    let mut system_txs = Vec::new();
    for tx in txs {
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
            nonce: parse_hex_u64(&tx.nonce)?,
            gas_price: parse_hex_u256(&tx.gas_price)?,
            gas_limit: parse_hex_u64(&tx.gas)?,
            to: tx.to,
            value: parse_hex_u256(&tx.value)?,
            input: tx.input,
            transfer_logs,
        };
        if let Some(system_tx) = normalize_tx(&raw, chain_id, native_system_address) {
            system_txs.push(system_tx);
        }
    }

    Ok(BlockData { number: block_number, hash: block.hash, timestamp, system_txs })
}

