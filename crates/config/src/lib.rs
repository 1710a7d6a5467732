//! Configuration loading for `bridge-correlator`: a TOML file on disk,
//! overridable by CLI flags and environment variables via `clap`, following
//! `reth-config`'s split of a serde-deserialized file plus derive-based CLI
//! args layered on top.

mod tunables;

use alloy_primitives::Address;
use bridge_errors::ConfigError;
use serde::Deserialize;
use std::path::Path;

pub use tunables::Tunables;

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Object key file extension (e.g. `"mpk"` for the message-pack block
    /// records).
    #[serde(default = "default_object_extension")]
    pub extension: String,
}

fn default_object_extension() -> String {
    "mpk".to_owned()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoreLedgerConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvmRpcConfig {
    pub base_url: String,
    pub chain_id: u64,
    /// Millisecond timestamp of block 1, used as the finder's seed anchor
    /// when the anchor index is empty (spec §4.E step 2).
    pub genesis_timestamp_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetMetadataConfig {
    pub base_url: String,
}

/// Top-level configuration: everything required to wire up a running
/// `bridge-correlator` process.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub object_store: ObjectStoreConfig,
    pub core_ledger: CoreLedgerConfig,
    pub evm_rpc: EvmRpcConfig,
    pub asset_metadata: AssetMetadataConfig,
    #[serde(default)]
    pub watched_addresses: Vec<Address>,
    #[serde(default)]
    pub tunables: Tunables,
}

impl Config {
    /// Load and parse a TOML config file. Does not validate — call
    /// [`Config::validate`] before using it to wire up components.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Fatal startup validation: empty watched-address set, unparseable
    /// URLs, or zero-valued tunables that must be positive all fail fast
    /// here, before any task is spawned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watched_addresses.is_empty() {
            return Err(ConfigError::Missing("watched_addresses".to_owned()));
        }
        for (field, url) in [
            ("storage.url", self.storage.url.as_str()),
            ("core_ledger.base_url", self.core_ledger.base_url.as_str()),
            ("evm_rpc.base_url", self.evm_rpc.base_url.as_str()),
            ("asset_metadata.base_url", self.asset_metadata.base_url.as_str()),
        ] {
            if !looks_like_url(url) {
                return Err(ConfigError::Invalid {
                    field: field.to_owned(),
                    reason: format!("{url:?} does not look like a URL"),
                });
            }
        }
        if self.evm_rpc.chain_id == 0 {
            return Err(ConfigError::Invalid {
                field: "evm_rpc.chain_id".to_owned(),
                reason: "chain id must be non-zero".to_owned(),
            });
        }

        let t = &self.tunables;
        for (field, value) in [
            ("tunables.evm_matcher_batch_size", t.evm_matcher_batch_size),
            ("tunables.evm_matcher_concurrency", t.evm_matcher_concurrency),
            ("tunables.max_batch_size", t.max_batch_size),
            ("tunables.queue_capacity", t.queue_capacity),
            ("tunables.low_watermark", t.low_watermark),
            ("tunables.dedup_set_max", t.dedup_set_max),
            ("tunables.dedup_set_retain", t.dedup_set_retain),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid { field: field.to_owned(), reason: "must be positive".to_owned() });
            }
        }
        if t.low_watermark >= t.queue_capacity {
            return Err(ConfigError::Invalid {
                field: "tunables.low_watermark".to_owned(),
                reason: "must be less than queue_capacity".to_owned(),
            });
        }
        if t.dedup_set_retain >= t.dedup_set_max {
            return Err(ConfigError::Invalid {
                field: "tunables.dedup_set_retain".to_owned(),
                reason: "must be less than dedup_set_max".to_owned(),
            });
        }
        Ok(())
    }

    /// Apply CLI overrides on top of a file-loaded config.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.storage_url {
            self.storage.url = url.clone();
        }
        if let Some(chain_id) = cli.chain_id {
            self.evm_rpc.chain_id = chain_id;
        }
    }
}

fn looks_like_url(s: &str) -> bool {
    ["http://", "https://", "mongodb://", "mongodb+srv://"].iter().any(|scheme| s.starts_with(scheme))
}

/// CLI overrides, layered on top of the TOML file. Only the handful of
/// fields operators commonly need to override at the command line are
/// exposed here; everything else lives in the config file.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "bridge-correlator", about = "CORE <-> EVM bridge transfer correlator")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "BRIDGE_CONFIG", default_value = "bridge-correlator.toml")]
    pub config: std::path::PathBuf,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

#[derive(Debug, Clone, clap::Args)]
#[command(next_help_heading = "Overrides")]
pub struct CliOverrides {
    /// Override `storage.url` from the config file.
    #[arg(long = "storage-url", env = "BRIDGE_STORAGE_URL")]
    pub storage_url: Option<String>,

    /// Override `evm_rpc.chain_id` from the config file.
    #[arg(long = "chain-id", env = "BRIDGE_CHAIN_ID")]
    pub chain_id: Option<u64>,
}

// Flatten convenience: `Cli` forwards to its nested `overrides` so
// `Config::apply_cli` can take either shape ergonomically.
impl std::ops::Deref for Cli {
    type Target = CliOverrides;
    fn deref(&self) -> &Self::Target {
        &self.overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
        [storage]
        url = "mongodb://localhost:27017/bridge"

        [object_store]
        bucket = "core-blocks"
        region = "us-east-1"
        access_key_id = "AKIA"
        secret_access_key = "secret"

        [core_ledger]
        base_url = "https://core.example.com/info"

        [evm_rpc]
        base_url = "https://evm.example.com"
        chain_id = 1337
        genesis_timestamp_ms = 1700000000000

        [asset_metadata]
        base_url = "https://core.example.com/info"

        watched_addresses = ["0x000000000000000000000000000000000000aa"]
    "#;

    #[test]
    fn from_file_parses_minimal_config_with_default_tunables() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config file");
        file.write_all(MINIMAL_TOML.as_bytes()).expect("write temp config file");

        let config = Config::from_file(file.path()).expect("parse config");
        assert_eq!(config.evm_rpc.chain_id, 1337);
        assert_eq!(config.watched_addresses.len(), 1);
        assert_eq!(config.tunables, Tunables::default());
        config.validate().expect("minimal config should validate");
    }

    #[test]
    fn from_file_missing_path_is_an_io_error() {
        let err = Config::from_file("/nonexistent/bridge-correlator.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn validate_rejects_empty_watched_addresses() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config file");
        file.write_all(MINIMAL_TOML.replace(
            r#"watched_addresses = ["0x000000000000000000000000000000000000aa"]"#,
            "",
        ).as_bytes()).expect("write temp config file");

        let config = Config::from_file(file.path()).expect("parse config");
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn validate_rejects_watermark_above_queue_capacity() {
        let mut config_file = tempfile::NamedTempFile::new().expect("create temp config file");
        config_file.write_all(MINIMAL_TOML.as_bytes()).expect("write temp config file");
        let mut config = Config::from_file(config_file.path()).expect("parse config");

        config.tunables.low_watermark = config.tunables.queue_capacity;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn apply_cli_overrides_storage_url_and_chain_id() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config file");
        file.write_all(MINIMAL_TOML.as_bytes()).expect("write temp config file");
        let mut config = Config::from_file(file.path()).expect("parse config");

        let cli = Cli::parse_from([
            "bridge-correlator",
            "--storage-url",
            "mongodb://override:27017/bridge",
            "--chain-id",
            "99",
        ]);
        config.apply_cli(&cli);

        assert_eq!(config.storage.url, "mongodb://override:27017/bridge");
        assert_eq!(config.evm_rpc.chain_id, 99);
    }
}
