use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use contract_deploy::{CONFIG_FILENAME, DeployConfig, NetworkConfig};
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "deploy-contract")]
#[command(
    author,
    version,
    about = "Deploy a compiled contract and print its address"
)]
pub struct Cli {
    /// The verbosity level. Logs are written to stderr.
    #[arg(short, long, env = "DEPLOY_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a configuration file (or a directory containing Deploy.toml).
    ///
    /// If not provided, ./Deploy.toml is used when it exists.
    #[arg(long, alias = "conf", env = "DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// The network to deploy to, as named in the configuration.
    #[arg(short, long)]
    pub network: Option<String>,

    /// The contract to deploy, by name or fully qualified name
    /// (e.g. `contracts/DAOVoting.sol:DAOVoting`).
    #[arg(short, long)]
    pub contract: Option<String>,

    /// Path to the compiled artifacts directory.
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Override the JSON-RPC endpoint of the selected network.
    #[arg(long, alias = "rpc")]
    pub rpc_url: Option<Url>,

    /// A constructor argument. Repeat for each parameter, in order.
    #[arg(long = "arg", value_name = "VALUE")]
    pub constructor_args: Vec<String>,
}

impl Cli {
    /// Load the layered configuration and apply the command line overrides.
    pub fn load_config(&self) -> Result<DeployConfig> {
        let mut config = match &self.config {
            Some(path) => DeployConfig::load_from_file(path)?,
            None => DeployConfig::load(&PathBuf::from(CONFIG_FILENAME))?,
        };

        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut DeployConfig) {
        if let Some(network) = &self.network {
            config.network = network.clone();
        }

        if let Some(contract) = &self.contract {
            config.contract = contract.clone();
        }

        if let Some(artifacts) = &self.artifacts {
            config.artifacts = artifacts.clone();
        }

        if !self.constructor_args.is_empty() {
            config.constructor_args = self.constructor_args.clone();
        }

        if let Some(rpc_url) = &self.rpc_url {
            config
                .networks
                .entry(config.network.clone())
                .and_modify(|network| network.rpc_url = rpc_url.clone())
                .or_insert_with(|| NetworkConfig::new(rpc_url.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["deploy-contract"]).unwrap();
        assert!(cli.network.is_none());
        assert!(cli.contract.is_none());
        assert!(cli.constructor_args.is_empty());

        let mut config = DeployConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, DeployConfig::default());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "deploy-contract",
            "--contract",
            "contracts/Ballot.sol:Ballot",
            "--arg",
            "3",
            "--arg",
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
            "--artifacts",
            "build/artifacts",
        ])
        .unwrap();

        let mut config = DeployConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.contract, "contracts/Ballot.sol:Ballot");
        assert_eq!(config.constructor_args.len(), 2);
        assert_eq!(config.artifacts, PathBuf::from("build/artifacts"));
    }

    #[test]
    fn test_rpc_url_for_new_network() {
        let cli = Cli::try_parse_from([
            "deploy-contract",
            "--network",
            "devnet",
            "--rpc-url",
            "http://10.0.0.2:8545",
        ])
        .unwrap();

        let mut config = DeployConfig::default();
        cli.apply_overrides(&mut config);

        let network = config.selected_network().unwrap();
        assert_eq!(network.rpc_url.as_str(), "http://10.0.0.2:8545/");
        // The default network is left untouched.
        assert_eq!(
            config.networks["localhost"].rpc_url.as_str(),
            "http://127.0.0.1:8545/"
        );
    }
}
