//! Entrypoint: load configuration, wire up every component named in the
//! system overview, and run until `SIGINT`/`SIGTERM`.

use std::sync::Arc;

use bridge_anchor_index::AnchorIndex;
use bridge_assets::{AssetCache, AssetMetadataClient};
use bridge_config::{Cli, Config};
use bridge_evm_fetch::{BlockFetcher, ObjectStoreConfig, ObjectStoreFetcher, RpcFetcher};
use bridge_finder::Finder;
use bridge_indexer::{CoreLedgerClient, IndexerFleet};
use bridge_matcher::MatcherPool;
use bridge_metrics::{FinderMetrics, IndexerMetrics, MatcherMetrics};
use bridge_primitives::{native_system_address, BlockAnchor};
use bridge_storage::{MongoStorage, Storage};
use bridge_tasks::{wait_for_signal, BackoffCoordinator, TaskManager};
use clap::Parser;

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let mut config = Config::from_file(&cli.config)?;
    config.apply_cli(&cli);
    config.validate()?;

    tokio::runtime::Builder::new_multi_thread().enable_all().build()?.block_on(run(config))
}

async fn run(config: Config) -> eyre::Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(MongoStorage::connect(&config.storage.url).await?);
    storage.ensure_indexes().await?;

    for address in &config.watched_addresses {
        storage
            .upsert_watched_address(bridge_primitives::WatchedAddress::new(*address))
            .await?;
    }

    let http = reqwest::Client::new();
    let backoff = BackoffCoordinator::new();

    let assets = Arc::new(AssetCache::new(AssetMetadataClient::new(http.clone(), config.asset_metadata.base_url.clone())));
    assets.populate().await.map_err(|e| eyre::eyre!("failed to populate asset cache at startup: {e}"))?;

    let rpc_client = jsonrpsee::http_client::HttpClientBuilder::default().build(&config.evm_rpc.base_url)?;
    let rpc_fetcher: Arc<dyn BlockFetcher> = Arc::new(RpcFetcher::new(
        rpc_client,
        config.evm_rpc.chain_id,
        native_system_address(),
        backoff.clone(),
        config.tunables.fetch_retry_attempts as usize,
    ));
    let object_store_fetcher: Arc<dyn BlockFetcher> = Arc::new(ObjectStoreFetcher::new(
        http.clone(),
        ObjectStoreConfig {
            bucket: config.object_store.bucket.clone(),
            region: config.object_store.region.clone(),
            access_key_id: config.object_store.access_key_id.clone(),
            secret_access_key: config.object_store.secret_access_key.clone(),
            endpoint: config.object_store.endpoint.clone(),
            extension: config.object_store.extension.clone(),
        },
        config.evm_rpc.chain_id,
        native_system_address(),
        backoff.clone(),
        config.tunables.fetch_retry_attempts as usize,
    ));

    let anchor_index = AnchorIndex::new(Arc::clone(&storage));
    let genesis = BlockAnchor { block_number: 1, block_timestamp: config.evm_rpc.genesis_timestamp_ms };
    let finder = Finder::new(genesis);

    let matcher_pool = MatcherPool::new(
        Arc::clone(&storage),
        anchor_index,
        Arc::clone(&assets),
        finder,
        rpc_fetcher,
        object_store_fetcher,
        MatcherMetrics::default(),
        config.tunables,
    );

    let core_ledger_client = CoreLedgerClient::new(http, config.core_ledger.base_url.clone());
    let indexer_fleet = IndexerFleet::new(
        Arc::clone(&storage),
        core_ledger_client,
        backoff,
        IndexerMetrics::default(),
        config.tunables,
    );

    // Registered for completeness of the grounding ledger; no exporter is
    // wired up (metrics emission is an external concern, spec §1).
    let _finder_metrics = FinderMetrics::default();

    let mut task_manager = TaskManager::new();
    matcher_pool.spawn(&mut task_manager);
    indexer_fleet.spawn(&mut task_manager);

    tracing::info!(target: "bridge_correlator", "bridge-correlator running");
    wait_for_signal().await;
    tracing::info!(target: "bridge_correlator", "shutdown signal received, draining tasks");

    task_manager.shutdown();
    task_manager.join_all().await;

    Ok(())
}
