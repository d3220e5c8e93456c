//! Sending accounts and local transaction signing.

use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, Bytes, TxKind, U256};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;

/// The account a creation transaction is sent from.
#[derive(Debug, Clone)]
pub enum Account {
    /// A key held locally; transactions are signed here and sent raw.
    Local(PrivateKeySigner),
    /// An account unlocked on the node; transactions are signed by the node.
    ///
    /// Without an explicit address the node's first account is used.
    NodeManaged(Option<Address>),
}

impl Account {
    /// Create a local account from a hex-encoded private key (with or without 0x prefix).
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, anyhow::Error> {
        let signer = private_key_hex
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| anyhow::anyhow!("Invalid secp256k1 private key: {}", e))?;
        Ok(Self::Local(signer))
    }
}

/// Fee parameters of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fees {
    /// EIP-1559 dynamic fees.
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    /// Pre-London gas price (EIP-155 replay protected).
    Legacy { gas_price: u128 },
}

impl Fees {
    /// EIP-1559 fees paying up to twice the current base fee.
    pub fn from_base_fee(base_fee: u128, priority_fee: u128) -> Self {
        Fees::Eip1559 {
            max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(priority_fee),
            max_priority_fee_per_gas: priority_fee,
        }
    }
}

/// Parameters of a contract creation transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationParams {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_limit: u64,
    pub fees: Fees,
}

/// Sign a contract creation transaction and return its EIP-2718 encoding.
pub fn sign_creation(
    signer: &PrivateKeySigner,
    params: &CreationParams,
    init_code: Bytes,
) -> Result<Bytes, anyhow::Error> {
    let envelope = match params.fees {
        Fees::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => {
            let tx = TxEip1559 {
                chain_id: params.chain_id,
                nonce: params.nonce,
                gas_limit: params.gas_limit,
                max_fee_per_gas,
                max_priority_fee_per_gas,
                to: TxKind::Create,
                value: U256::ZERO,
                input: init_code,
                ..Default::default()
            };
            let signature = signer
                .sign_hash_sync(&tx.signature_hash())
                .context("Failed to sign creation transaction")?;
            TxEnvelope::Eip1559(tx.into_signed(signature))
        }
        Fees::Legacy { gas_price } => {
            let tx = TxLegacy {
                chain_id: Some(params.chain_id),
                nonce: params.nonce,
                gas_price,
                gas_limit: params.gas_limit,
                to: TxKind::Create,
                value: U256::ZERO,
                input: init_code,
            };
            let signature = signer
                .sign_hash_sync(&tx.signature_hash())
                .context("Failed to sign creation transaction")?;
            TxEnvelope::Legacy(tx.into_signed(signature))
        }
    };

    Ok(envelope.encoded_2718().into())
}
