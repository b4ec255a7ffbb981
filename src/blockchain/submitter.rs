//! Claim transaction submission.
//!
//! # Responsibilities
//! - Build the `claimUSDC(code)` transaction
//! - Sign and broadcast it exactly once
//! - Keep "signing declined" distinct from "node or contract refused"
//!
//! Retrying is the caller's decision; nothing here retries.

use alloy::network::TransactionBuilder;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{RpcError, TransportError};
use futures_util::future::BoxFuture;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::blockchain::contract::{claim_calldata, code_hash};
use crate::blockchain::types::{BlockchainConfig, BlockchainError, BlockchainResult, TransactionId};
use crate::blockchain::wallet::Wallet;
use crate::claim::attempt::Code;
use crate::observability::metrics;

/// EIP-1193 "User Rejected Request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// Why a claim transaction was not submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The signing prompt was declined.
    #[error("user rejected the request: {0}")]
    UserRejected(String),

    /// The node or the contract refused the call (e.g. gas estimation reverted).
    #[error("{0}")]
    Rejected(String),

    /// The RPC endpoint could not be reached or did not answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The local signer could not produce a signature.
    #[error("signer error: {0}")]
    Signer(String),
}

impl SubmissionError {
    /// Metrics label.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UserRejected(_) => "user_rejected",
            Self::Rejected(_) => "rejected",
            Self::Transport(_) => "transport",
            Self::Signer(_) => "signer",
        }
    }
}

impl From<TransportError> for SubmissionError {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) if payload.code == USER_REJECTED_CODE => {
                Self::UserRejected(payload.message.to_string())
            }
            RpcError::ErrorResp(payload) => Self::Rejected(payload.to_string()),
            RpcError::LocalUsageError(e) => Self::Signer(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Issues the state-changing claim call.
pub trait ClaimSubmitter: Send + Sync {
    /// Submit `claimUSDC(code)` from `from`, returning the transaction id.
    fn submit<'a>(
        &'a self,
        code: &'a Code,
        from: Address,
    ) -> BoxFuture<'a, Result<TransactionId, SubmissionError>>;
}

/// Submitter that signs with a local key and broadcasts over JSON-RPC.
#[derive(Clone)]
pub struct ContractSubmitter {
    provider: DynProvider,
    contract: Address,
    timeout_duration: Duration,
}

impl ContractSubmitter {
    /// Create a submitter for the contract at `contract`.
    ///
    /// The provider fills nonce, gas and chain ID before signing with `wallet`.
    pub fn new(config: &BlockchainConfig, wallet: &Wallet, contract: Address) -> BlockchainResult<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let provider = ProviderBuilder::new()
            .wallet(wallet.ethereum_wallet())
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            contract,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
        })
    }

    async fn send(&self, code: &Code, from: Address) -> Result<TransactionId, SubmissionError> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(self.contract)
            .with_input(claim_calldata(code.as_str()));

        match timeout(self.timeout_duration, self.provider.send_transaction(tx)).await {
            Ok(Ok(pending)) => Ok(TransactionId::from(*pending.tx_hash())),
            Ok(Err(e)) => Err(SubmissionError::from(e)),
            Err(_) => Err(SubmissionError::Transport(format!(
                "no response after {} seconds",
                self.timeout_duration.as_secs()
            ))),
        }
    }
}

impl std::fmt::Debug for ContractSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractSubmitter")
            .field("contract", &self.contract)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}

impl ClaimSubmitter for ContractSubmitter {
    fn submit<'a>(
        &'a self,
        code: &'a Code,
        from: Address,
    ) -> BoxFuture<'a, Result<TransactionId, SubmissionError>> {
        Box::pin(async move {
            let code_hash = code_hash(code.as_str());
            tracing::info!(%code_hash, %from, contract = %self.contract, "Submitting claim");

            let result = self.send(code, from).await;
            match &result {
                Ok(tx_id) => {
                    tracing::info!(%code_hash, tx = %tx_id, "Claim transaction broadcast");
                    metrics::record_submission("accepted");
                }
                Err(e) => {
                    tracing::warn!(%code_hash, error = %e, kind = e.kind(), "Claim submission failed");
                    metrics::record_submission(e.kind());
                }
            }
            result
        })
    }
}

/// Submitter used when no signing key is configured. The session is then
/// disconnected, so the controller never reaches it in practice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSigner;

impl ClaimSubmitter for NoSigner {
    fn submit<'a>(
        &'a self,
        _code: &'a Code,
        _from: Address,
    ) -> BoxFuture<'a, Result<TransactionId, SubmissionError>> {
        Box::pin(async { Err(SubmissionError::Signer("no signing key configured".to_string())) })
    }
}
