//! contract-deploy - Deploy a compiled smart contract and report its address.
//!
//! A run resolves a compiled artifact by name, submits a contract creation
//! transaction, waits for it to be included and reports the address of the
//! new contract. The build output and the network are reached through two
//! narrow capabilities, [`ArtifactSource`] and [`Network`].
//!
//! # Example
//!
//! ```no_run
//! use contract_deploy::{ArtifactStore, DeployConfig, Deployer, RpcNetwork};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DeployConfig::default();
//! let network = RpcNetwork::from_config(config.selected_network()?)?;
//! let deployer = Deployer::new(ArtifactStore::new(&config.artifacts), network, "DAOVoting");
//!
//! let report = deployer.run(&mut std::io::stdout()).await?;
//! println!("{}", report.address);
//! # Ok(())
//! # }
//! ```

mod artifact;
pub use artifact::{ArtifactSource, ArtifactStore, CompiledArtifact};

mod config;
pub use config::{
    CONFIG_FILENAME, DEFAULT_CONTRACT, DEFAULT_NETWORK, DeployConfig, ENV_PREFIX, NetworkConfig,
};

mod deployer;
pub use deployer::{Deployer, Deployment, DeploymentReport};

mod error;
pub use error::DeployError;

mod network;
pub use network::{Network, RpcNetwork};

pub mod rpc;

mod signer;
pub use signer::{Account, CreationParams, Fees, sign_creation};

mod stages;
pub use stages::{
    Confirmation, Confirmed, CreationRequest, DeploymentStage, PendingDeployment, Resolved, Stage,
    Submitted,
};

pub use alloy_core::primitives::{Address, B256};
