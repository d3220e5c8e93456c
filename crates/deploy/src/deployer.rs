//! Deployment orchestration.
//!
//! A run is a single pass: resolve the artifact, submit the creation
//! transaction, wait for it to be included, then report the contract address.
//! The first failure ends the run; nothing is retried or rolled back.

use std::io::Write;

use alloy_core::primitives::{Address, B256};

use crate::{
    artifact::{self, ArtifactSource},
    error::DeployError,
    network::Network,
    stages::{Confirmed, DeploymentStage, Resolved, Stage, Submitted},
};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub contract_name: String,
    pub address: Address,
    pub tx_hash: B256,
    pub block_number: u64,
}

/// A deployment in progress, after the step recorded by `S` has completed.
///
/// Every transition consumes the deployment, so a step cannot be run twice.
#[derive(Debug)]
pub struct Deployment<S: DeploymentStage> {
    state: S,
}

impl<S: DeploymentStage> Deployment<S> {
    fn enter(state: S) -> Self {
        tracing::debug!(stage = %S::NEXT, "Entering stage");
        Self { state }
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

impl Deployment<Resolved> {
    /// Resolve the named artifact and build its creation request.
    pub async fn resolve<A>(
        artifacts: &A,
        name: &str,
        constructor_args: &[String],
    ) -> Result<Self, DeployError>
    where
        A: ArtifactSource + ?Sized,
    {
        let resolution_error = |source: anyhow::Error| DeployError::ArtifactResolution {
            name: name.to_string(),
            source,
        };

        let artifact = artifacts.resolve(name).await.map_err(resolution_error)?;
        let request = artifact
            .creation_request(constructor_args)
            .map_err(resolution_error)?;

        tracing::info!(
            artifact = %artifact.fully_qualified_name(),
            init_code_len = request.init_code.len(),
            "Artifact resolved"
        );

        Ok(Self::enter(Resolved { request }))
    }

    /// Submit the creation transaction.
    pub async fn submit<N>(self, network: &N) -> Result<Deployment<Submitted>, DeployError>
    where
        N: Network + ?Sized,
    {
        let contract_name = self.state.request.contract_name.clone();

        let pending = network
            .submit(self.state.request)
            .await
            .map_err(|source| DeployError::Submission { source })?;

        Ok(Deployment::enter(Submitted {
            contract_name,
            pending,
        }))
    }
}

impl Deployment<Submitted> {
    /// Wait for the creation transaction to be included.
    pub async fn confirm<N>(self, network: &N) -> Result<Deployment<Confirmed>, DeployError>
    where
        N: Network + ?Sized,
    {
        let tx_hash = self.state.pending.tx_hash;

        let confirmation = network
            .await_inclusion(&self.state.pending)
            .await
            .map_err(|source| DeployError::Confirmation { tx_hash, source })?;

        Ok(Deployment::enter(Confirmed {
            contract_name: self.state.contract_name,
            confirmation,
        }))
    }
}

impl Deployment<Confirmed> {
    /// Look up the address of the created contract.
    pub async fn report<N>(self, network: &N) -> Result<DeploymentReport, DeployError>
    where
        N: Network + ?Sized,
    {
        let confirmation = self.state.confirmation;

        let address = network
            .contract_address(&confirmation)
            .await
            .map_err(|source| DeployError::AddressResolution {
                tx_hash: confirmation.tx_hash,
                source,
            })?;

        Ok(DeploymentReport {
            contract_name: self.state.contract_name,
            address,
            tx_hash: confirmation.tx_hash,
            block_number: confirmation.block_number,
        })
    }
}

/// Deploys one contract from an artifact source to a network.
pub struct Deployer<A, N> {
    artifacts: A,
    network: N,
    contract: String,
    constructor_args: Vec<String>,
}

impl<A, N> Deployer<A, N>
where
    A: ArtifactSource,
    N: Network,
{
    pub fn new(artifacts: A, network: N, contract: impl Into<String>) -> Self {
        Self {
            artifacts,
            network,
            contract: contract.into(),
            constructor_args: Vec::new(),
        }
    }

    /// Set the constructor arguments, in their textual form.
    pub fn constructor_args(mut self, args: Vec<String>) -> Self {
        self.constructor_args = args;
        self
    }

    /// Run the deployment, writing progress and the result to `out`.
    ///
    /// On success `out` receives exactly two lines: a progress announcement and
    /// the address line. On failure no address line is written.
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<DeploymentReport, DeployError> {
        let (_, contract_name) = artifact::split_qualified_name(&self.contract);
        writeln!(out, "Deploying {} contract...", contract_name).map_err(|source| {
            DeployError::Output {
                stage: Stage::Idle,
                source,
            }
        })?;

        let report = match self.execute().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(stage = %e.stage(), error = %e, "Deployment failed");
                return Err(e);
            }
        };

        writeln!(
            out,
            "{} deployed to: {}",
            report.contract_name, report.address
        )
        .map_err(|source| DeployError::Output {
            stage: Stage::Reporting,
            source,
        })?;

        tracing::info!(
            contract = %report.contract_name,
            address = %report.address,
            tx_hash = %report.tx_hash,
            block_number = report.block_number,
            "✓ Deployment complete!"
        );

        Ok(report)
    }

    async fn execute(&self) -> Result<DeploymentReport, DeployError> {
        tracing::info!(contract = %self.contract, "Starting deployment...");

        Deployment::<Resolved>::resolve(&self.artifacts, &self.contract, &self.constructor_args)
            .await?
            .submit(&self.network)
            .await?
            .confirm(&self.network)
            .await?
            .report(&self.network)
            .await
    }
}
