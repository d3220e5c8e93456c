//! Deployment stages.
//!
//! The run order is fixed: Resolve -> Submit -> Await confirmation -> Report.
//! [`Stage`] names the runtime states of a run, while the stage markers
//! ([`Resolved`], [`Submitted`], [`Confirmed`]) carry the data each completed
//! step hands over to the next one.

use alloy_core::primitives::{Address, B256, Bytes};

/// Runtime state of a deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    Idle,
    Resolving,
    Submitting,
    AwaitingConfirmation,
    Reporting,
    Done,
    Failed,
}

impl Stage {
    /// The stage following this one on the success path.
    ///
    /// Returns `None` for terminal stages.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Resolving),
            Stage::Resolving => Some(Stage::Submitting),
            Stage::Submitting => Some(Stage::AwaitingConfirmation),
            Stage::AwaitingConfirmation => Some(Stage::Reporting),
            Stage::Reporting => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }
}

/// A contract creation request built from a resolved artifact.
///
/// Consumed by submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationRequest {
    /// Name of the contract being created.
    pub contract_name: String,
    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub init_code: Bytes,
}

/// A creation transaction accepted by the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    pub tx_hash: B256,
    pub sender: Address,
    pub nonce: Option<u64>,
}

/// Inclusion receipt of a creation transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: Option<u64>,
    /// Address reported by the receipt, if any.
    pub contract_address: Option<Address>,
}

/// Marker for a resolved artifact, ready to be submitted.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub request: CreationRequest,
}

/// Marker for a submitted creation transaction.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub contract_name: String,
    pub pending: PendingDeployment,
}

/// Marker for a confirmed creation transaction.
#[derive(Debug, Clone)]
pub struct Confirmed {
    pub contract_name: String,
    pub confirmation: Confirmation,
}

/// Sealed trait for deployment stages.
mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Resolved {}
    impl Sealed for super::Submitted {}
    impl Sealed for super::Confirmed {}
}

/// Marker trait for completed deployment steps.
pub trait DeploymentStage: sealed::Sealed + Send + Sync + 'static {
    /// The runtime stage entered once this step has completed.
    const NEXT: Stage;
}

impl DeploymentStage for Resolved {
    const NEXT: Stage = Stage::Submitting;
}

impl DeploymentStage for Submitted {
    const NEXT: Stage = Stage::AwaitingConfirmation;
}

impl DeploymentStage for Confirmed {
    const NEXT: Stage = Stage::Reporting;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_linear() {
        let mut stage = Stage::Idle;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            visited.push(next);
            stage = next;
        }

        assert_eq!(
            visited,
            vec![
                Stage::Idle,
                Stage::Resolving,
                Stage::Submitting,
                Stage::AwaitingConfirmation,
                Stage::Reporting,
                Stage::Done,
            ]
        );
    }

    #[test]
    fn test_terminal_stages() {
        assert!(Stage::Done.next().is_none());
        assert!(Stage::Failed.next().is_none());
        assert!(Stage::AwaitingConfirmation.next().is_some());
    }

    #[test]
    fn test_stage_markers_follow_runtime_order() {
        assert_eq!(Stage::Resolving.next(), Some(Resolved::NEXT));
        assert_eq!(Stage::Submitting.next(), Some(Submitted::NEXT));
        assert_eq!(Stage::AwaitingConfirmation.next(), Some(Confirmed::NEXT));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::AwaitingConfirmation.to_string(), "awaiting-confirmation");
    }
}
