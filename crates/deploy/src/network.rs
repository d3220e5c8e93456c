//! Network capability: submit a contract creation, wait for its inclusion and
//! look up the created contract.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::NetworkConfig,
    rpc::{self, RpcClient},
    signer::{self, Account, CreationParams, Fees},
    stages::{Confirmation, CreationRequest, PendingDeployment},
};

/// Priority fee used when the node does not implement `eth_maxPriorityFeePerGas`.
pub const DEFAULT_PRIORITY_FEE: u128 = 1_000_000_000;

/// Capability to create a contract on a connected network.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Submit a contract creation transaction.
    async fn submit(&self, request: CreationRequest) -> Result<PendingDeployment>;

    /// Wait until the transaction is included. This wait is not bounded.
    async fn await_inclusion(&self, pending: &PendingDeployment) -> Result<Confirmation>;

    /// Address of the contract created by a confirmed transaction.
    async fn contract_address(&self, confirmation: &Confirmation) -> Result<Address>;
}

/// Block header fields needed for fee estimation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockHeader {
    #[serde(default, deserialize_with = "rpc::deserialize_opt_u128_from_hex")]
    base_fee_per_gas: Option<u128>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: B256,
    #[serde(default, deserialize_with = "rpc::deserialize_opt_u64_from_hex")]
    block_number: Option<u64>,
    #[serde(default, deserialize_with = "rpc::deserialize_opt_u64_from_hex")]
    gas_used: Option<u64>,
    #[serde(default, deserialize_with = "rpc::deserialize_opt_u64_from_hex")]
    status: Option<u64>,
    #[serde(default)]
    contract_address: Option<Address>,
}

/// [`Network`] backed by an Ethereum JSON-RPC endpoint.
#[derive(Debug)]
pub struct RpcNetwork {
    client: RpcClient,
    account: Account,
    chain_id: Option<u64>,
    gas_limit: Option<u64>,
    confirmations: u64,
    poll_interval: Duration,
}

impl RpcNetwork {
    pub fn new(client: RpcClient, account: Account) -> Self {
        Self {
            client,
            account,
            chain_id: None,
            gas_limit: None,
            confirmations: 1,
            poll_interval: Duration::from_millis(crate::config::DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Build a network from its configuration.
    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        let client = RpcClient::new(
            config.rpc_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;

        let account = match &config.private_key {
            Some(key) => Account::from_private_key(key)?,
            None => Account::NodeManaged(config.from),
        };

        Ok(Self {
            chain_id: config.chain_id,
            gas_limit: config.gas_limit,
            confirmations: config.confirmations.max(1),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            ..Self::new(client, account)
        })
    }

    /// Fetch the chain ID and check it against the configured one.
    async fn chain_id(&self) -> Result<u64> {
        let chain_id: String = self.client.call("eth_chainId", vec![]).await?;
        let chain_id = rpc::parse_hex_u64(&chain_id).context("Invalid eth_chainId result")?;

        if let Some(expected) = self.chain_id {
            if expected != chain_id {
                anyhow::bail!(
                    "Connected to chain {} but the network is configured for chain {}",
                    chain_id,
                    expected
                );
            }
        }

        Ok(chain_id)
    }

    async fn pending_nonce(&self, sender: Address) -> Result<u64> {
        let nonce: String = self
            .client
            .call(
                "eth_getTransactionCount",
                vec![serde_json::json!(sender), serde_json::json!("pending")],
            )
            .await?;
        rpc::parse_hex_u64(&nonce).context("Invalid eth_getTransactionCount result")
    }

    async fn gas_limit(&self, sender: Address, init_code: &Bytes) -> Result<u64> {
        if let Some(gas_limit) = self.gas_limit {
            return Ok(gas_limit);
        }

        let estimate: String = self
            .client
            .call(
                "eth_estimateGas",
                vec![serde_json::json!({ "from": sender, "data": init_code })],
            )
            .await
            .context("Failed to estimate gas for contract creation")?;
        rpc::parse_hex_u64(&estimate).context("Invalid eth_estimateGas result")
    }

    /// Current fee parameters: EIP-1559 when the chain has a base fee, legacy otherwise.
    async fn fees(&self) -> Result<Fees> {
        let block: Option<BlockHeader> = self
            .client
            .call(
                "eth_getBlockByNumber",
                vec![serde_json::json!("latest"), serde_json::json!(false)],
            )
            .await?;

        if let Some(base_fee) = block.and_then(|block| block.base_fee_per_gas) {
            let priority_fee = match self
                .client
                .call::<String>("eth_maxPriorityFeePerGas", vec![])
                .await
            {
                Ok(fee) => rpc::parse_hex_u128(&fee)
                    .context("Invalid eth_maxPriorityFeePerGas result")?,
                Err(e) => {
                    tracing::debug!(error = %e, "Priority fee unavailable, using default");
                    DEFAULT_PRIORITY_FEE
                }
            };
            return Ok(Fees::from_base_fee(base_fee, priority_fee));
        }

        let gas_price: String = self.client.call("eth_gasPrice", vec![]).await?;
        Ok(Fees::Legacy {
            gas_price: rpc::parse_hex_u128(&gas_price).context("Invalid eth_gasPrice result")?,
        })
    }

    async fn node_account(&self, configured: Option<Address>) -> Result<Address> {
        if let Some(address) = configured {
            return Ok(address);
        }

        let accounts: Vec<Address> = self.client.call("eth_accounts", vec![]).await?;
        accounts
            .first()
            .copied()
            .context("The node manages no accounts; configure a private key for this network")
    }

    async fn block_number(&self) -> Result<u64> {
        let number: String = self.client.call("eth_blockNumber", vec![]).await?;
        rpc::parse_hex_u64(&number).context("Invalid eth_blockNumber result")
    }
}

/// Number of blocks, counting its own, on top of a transaction included in `block_number`.
fn confirmations_at(head: u64, block_number: u64) -> u64 {
    head.saturating_sub(block_number).saturating_add(1)
}

#[async_trait::async_trait]
impl Network for RpcNetwork {
    async fn submit(&self, request: CreationRequest) -> Result<PendingDeployment> {
        let chain_id = self.chain_id().await?;

        let (sender, nonce, tx_hash) = match &self.account {
            Account::Local(signer) => {
                let sender = signer.address();
                let nonce = self.pending_nonce(sender).await?;
                let gas_limit = self.gas_limit(sender, &request.init_code).await?;
                let fees = self.fees().await?;

                let params = CreationParams {
                    chain_id,
                    nonce,
                    gas_limit,
                    fees,
                };
                tracing::debug!(?params, %sender, "Signing creation transaction");

                let raw = signer::sign_creation(signer, &params, request.init_code)?;
                let tx_hash: B256 = self
                    .client
                    .call("eth_sendRawTransaction", vec![serde_json::json!(raw)])
                    .await?;
                (sender, nonce, tx_hash)
            }
            Account::NodeManaged(configured) => {
                let sender = self.node_account(*configured).await?;
                let nonce = self.pending_nonce(sender).await?;

                let mut tx = serde_json::json!({
                    "from": sender,
                    "data": request.init_code,
                });
                if let Some(gas_limit) = self.gas_limit {
                    tx["gas"] = Value::String(format!("0x{:x}", gas_limit));
                }

                let tx_hash: B256 = self.client.call("eth_sendTransaction", vec![tx]).await?;
                (sender, nonce, tx_hash)
            }
        };

        tracing::info!(
            %tx_hash,
            %sender,
            nonce,
            chain_id,
            expected_address = %sender.create(nonce),
            contract = %request.contract_name,
            "Creation transaction sent"
        );

        Ok(PendingDeployment {
            tx_hash,
            sender,
            nonce: Some(nonce),
        })
    }

    async fn await_inclusion(&self, pending: &PendingDeployment) -> Result<Confirmation> {
        tracing::info!(
            tx_hash = %pending.tx_hash,
            confirmations = self.confirmations,
            "Waiting for transaction to be included..."
        );

        loop {
            let receipt: Option<TransactionReceipt> = self
                .client
                .call(
                    "eth_getTransactionReceipt",
                    vec![serde_json::json!(pending.tx_hash)],
                )
                .await?;

            if let Some(receipt) = receipt {
                if let Some(block_number) = receipt.block_number {
                    if receipt.status == Some(0) {
                        anyhow::bail!(
                            "Transaction {} reverted in block {}",
                            receipt.transaction_hash,
                            block_number
                        );
                    }

                    let head = if self.confirmations > 1 {
                        self.block_number().await?
                    } else {
                        block_number
                    };

                    if confirmations_at(head, block_number) >= self.confirmations {
                        tracing::info!(
                            tx_hash = %receipt.transaction_hash,
                            block_number,
                            gas_used = receipt.gas_used,
                            "Transaction confirmed"
                        );

                        return Ok(Confirmation {
                            tx_hash: receipt.transaction_hash,
                            block_number,
                            gas_used: receipt.gas_used,
                            contract_address: receipt.contract_address,
                        });
                    }

                    tracing::debug!(block_number, head, "Waiting for more confirmations");
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn contract_address(&self, confirmation: &Confirmation) -> Result<Address> {
        let address = confirmation
            .contract_address
            .context("Receipt carries no contract address")?;

        let code: Bytes = self
            .client
            .call(
                "eth_getCode",
                vec![serde_json::json!(address), serde_json::json!("latest")],
            )
            .await?;

        if code.is_empty() {
            anyhow::bail!("No code deployed at {}", address);
        }

        Ok(address)
    }
}
