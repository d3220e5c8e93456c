//! deploy-contract deploys a single compiled contract and prints its address.

mod cli;

use anyhow::Result;
use clap::Parser;

use cli::Cli;
use contract_deploy::{ArtifactStore, Deployer, RpcNetwork};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger. Stdout is reserved for the deployment report.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.load_config()?;
    let network_config = config.selected_network()?;

    tracing::info!(
        network = %config.network,
        rpc_url = %network_config.rpc_url,
        artifacts = %config.artifacts.display(),
        contract = %config.contract,
        "Loaded deployment configuration"
    );

    let network = RpcNetwork::from_config(network_config)?;
    let artifacts = ArtifactStore::new(&config.artifacts);

    let deployer = Deployer::new(artifacts, network, config.contract.clone())
        .constructor_args(config.constructor_args.clone());

    deployer.run(&mut std::io::stdout()).await?;

    Ok(())
}
