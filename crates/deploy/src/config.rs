//! Deployment configuration.
//!
//! Configuration is layered: built-in defaults, then the `Deploy.toml` file,
//! then `DEPLOY_`-prefixed environment variables (nested keys separated by
//! `__`, e.g. `DEPLOY_NETWORKS__SEPOLIA__RPC_URL`).

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Deploy.toml";

/// Prefix of the environment variables read by [`DeployConfig::load`].
pub const ENV_PREFIX: &str = "DEPLOY_";

/// Network used when none is selected.
pub const DEFAULT_NETWORK: &str = "localhost";

/// RPC endpoint of the default network.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Contract deployed when none is selected.
pub const DEFAULT_CONTRACT: &str = "DAOVoting";

/// Default directory holding the compiled artifacts.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

pub const DEFAULT_CONFIRMATIONS: u64 = 1;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Top-level deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Name of the network to deploy to (a key of `networks`).
    pub network: String,
    /// Name of the contract to deploy, bare or fully qualified.
    pub contract: String,
    /// Constructor arguments, in their textual form.
    #[serde(default)]
    pub constructor_args: Vec<String>,
    /// Path to the compiled artifacts directory.
    pub artifacts: PathBuf,
    /// Known networks, by name.
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let localhost = NetworkConfig::new(
            Url::parse(DEFAULT_RPC_URL).expect("default RPC URL is valid"),
        );

        Self {
            network: DEFAULT_NETWORK.to_string(),
            contract: DEFAULT_CONTRACT.to_string(),
            constructor_args: Vec::new(),
            artifacts: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            networks: BTreeMap::from([(DEFAULT_NETWORK.to_string(), localhost)]),
        }
    }
}

/// Connection settings for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Expected chain ID. Checked against the node before submitting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Hex-encoded private key of the sending account.
    ///
    /// When absent, the transaction is sent from an account unlocked on the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Node-managed sender. Defaults to the node's first account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Fixed gas limit. Estimated by the node when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Number of blocks, including the inclusion block, to wait for.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Interval between receipt polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Timeout of a single RPC request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl NetworkConfig {
    pub fn new(rpc_url: Url) -> Self {
        Self {
            rpc_url,
            chain_id: None,
            private_key: None,
            from: None,
            gas_limit: None,
            confirmations: DEFAULT_CONFIRMATIONS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_confirmations() -> u64 {
    DEFAULT_CONFIRMATIONS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl DeployConfig {
    /// The layered configuration sources, lowest priority first.
    ///
    /// A missing file at `path` is skipped.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(DeployConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load the configuration from `path`, the environment and the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = Self::figment(path)
            .extract()
            .context("Failed to load deployment configuration")?;

        tracing::debug!(
            path = %path.display(),
            network = %config.network,
            contract = %config.contract,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load the configuration from an explicitly given file, which must exist.
    ///
    /// A directory is searched for [`CONFIG_FILENAME`].
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Configuration file or directory not found: {}", path.display());
        }

        let config_path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        Self::load(&config_path)
    }

    /// The configuration of the selected network.
    pub fn selected_network(&self) -> Result<&NetworkConfig> {
        self.networks.get(&self.network).with_context(|| {
            format!(
                "Unknown network `{}`. Known networks: {}",
                self.network,
                self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }
}
