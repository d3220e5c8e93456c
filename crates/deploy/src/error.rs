//! Error taxonomy for a deployment run.
//!
//! Each variant maps to exactly one step of the run. Nothing is retried: the
//! first failure ends the run and is surfaced to the caller as-is.

use alloy_core::primitives::B256;

use crate::stages::Stage;

/// A terminal failure of a deployment run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The compiled artifact could not be resolved from the build output.
    #[error("failed to resolve artifact `{name}`")]
    ArtifactResolution {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The contract creation transaction was not accepted by the network.
    #[error("failed to submit contract creation transaction")]
    Submission {
        #[source]
        source: anyhow::Error,
    },

    /// Waiting for the transaction to be included failed.
    ///
    /// The transaction may still have been included on-chain.
    #[error("failed to confirm transaction {tx_hash}")]
    Confirmation {
        tx_hash: B256,
        #[source]
        source: anyhow::Error,
    },

    /// The transaction was confirmed but no contract address could be determined.
    #[error("transaction {tx_hash} was confirmed but the contract address is unknown")]
    AddressResolution {
        tx_hash: B256,
        #[source]
        source: anyhow::Error,
    },

    /// A progress or report line could not be written.
    #[error("failed to write deployment output")]
    Output {
        /// The stage the run was in when writing failed.
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    /// The stage the run was in when this error occurred.
    pub fn stage(&self) -> Stage {
        match self {
            Self::ArtifactResolution { .. } => Stage::Resolving,
            Self::Submission { .. } => Stage::Submitting,
            Self::Confirmation { .. } => Stage::AwaitingConfirmation,
            Self::AddressResolution { .. } => Stage::Reporting,
            Self::Output { stage, .. } => *stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_stage_mapping() {
        let err = DeployError::ArtifactResolution {
            name: "Missing".to_string(),
            source: anyhow::anyhow!("not found"),
        };
        assert_eq!(err.stage(), Stage::Resolving);

        let err = DeployError::Confirmation {
            tx_hash: B256::ZERO,
            source: anyhow::anyhow!("connection reset"),
        };
        assert_eq!(err.stage(), Stage::AwaitingConfirmation);

        let err = DeployError::Output {
            stage: Stage::Idle,
            source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
        };
        assert_eq!(err.stage(), Stage::Idle);
    }

    #[test]
    fn test_error_keeps_source_chain() {
        let err = DeployError::Submission {
            source: anyhow::anyhow!("insufficient funds for gas * price + value"),
        };
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert!(chain.contains("failed to submit"));
        assert!(chain.contains("insufficient funds"));
    }
}
