//! Confirmation tracking for submitted claims.
//!
//! # Responsibilities
//! - Poll for the transaction receipt until it is mined
//! - Wait for the configured confirmation depth
//! - Report "not yet mined" vs "mined, awaiting depth" while pending
//! - Give up after the configured deadline
//!
//! Transient RPC failures are logged and polling continues; only the receipt
//! status or the deadline end tracking.

use alloy::primitives::{Address, TxHash};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::contract::find_code_claimed;
use crate::blockchain::types::{
    BlockchainConfig, BlockchainResult, ClaimedEvent, ReceiptSummary, TransactionId,
};
use crate::observability::metrics;

/// Pending sub-state of a tracked transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TrackingPhase {
    /// No receipt yet.
    NotMined,
    /// Included in `block_number`; waiting for `required` confirmations.
    Mined {
        block_number: u64,
        confirmations: u32,
        required: u32,
    },
}

/// A successfully mined transaction at the required depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub block_number: u64,
    pub confirmations: u32,
    pub required: u32,
    /// `CodeClaimed` event emitted by the contract, if found.
    pub claimed: Option<ClaimedEvent>,
}

impl Confirmation {
    /// The final tracking phase.
    pub fn phase(&self) -> TrackingPhase {
        TrackingPhase::Mined {
            block_number: self.block_number,
            confirmations: self.confirmations,
            required: self.required,
        }
    }
}

/// Why tracking ended without a confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackingError {
    /// Mined with a failure status.
    #[error("Transaction reverted on-chain in block {block_number}")]
    Reverted { block_number: u64 },

    /// Not confirmed before the deadline.
    #[error("Transaction not confirmed after {after_secs} seconds")]
    Timeout { after_secs: u64 },

    /// The transaction id is not a transaction hash.
    #[error("Malformed transaction id: {0}")]
    Malformed(String),
}

impl TrackingError {
    /// Metrics label.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Reverted { .. } => "reverted",
            Self::Timeout { .. } => "timeout",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Progress callback; invoked only when the phase changes.
pub type ProgressFn<'a> = &'a (dyn Fn(TrackingPhase) + Send + Sync);

/// Observes a submitted transaction until it reaches a terminal status.
pub trait TransactionTracker: Send + Sync {
    fn track<'a>(
        &'a self,
        tx_id: &'a TransactionId,
        on_progress: ProgressFn<'a>,
    ) -> BoxFuture<'a, Result<Confirmation, TrackingError>>;
}

/// Chain queries the receipt tracker needs.
pub trait ReceiptSource: Send + Sync {
    fn latest_block(&self) -> BoxFuture<'_, BlockchainResult<u64>>;

    fn receipt(&self, tx_hash: TxHash) -> BoxFuture<'_, BlockchainResult<Option<ReceiptSummary>>>;
}

/// Receipts read through the failover client, with claim events decoded.
#[derive(Debug, Clone)]
pub struct ChainReceipts {
    client: BlockchainClient,
    contract: Address,
}

impl ChainReceipts {
    pub fn new(client: BlockchainClient, contract: Address) -> Self {
        Self { client, contract }
    }
}

impl ReceiptSource for ChainReceipts {
    fn latest_block(&self) -> BoxFuture<'_, BlockchainResult<u64>> {
        Box::pin(self.client.get_block_number())
    }

    fn receipt(&self, tx_hash: TxHash) -> BoxFuture<'_, BlockchainResult<Option<ReceiptSummary>>> {
        Box::pin(async move {
            let receipt = self.client.get_transaction_receipt(tx_hash).await?;
            Ok(receipt.map(|r| ReceiptSummary {
                success: r.status(),
                block_number: r.block_number,
                claimed: find_code_claimed(self.contract, r.inner.logs()),
            }))
        })
    }
}

/// Timing knobs for [`ReceiptTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    pub confirmation_blocks: u32,
    pub poll_interval: Duration,
    pub deadline: Duration,
}

impl From<&BlockchainConfig> for TrackerSettings {
    fn from(config: &BlockchainConfig) -> Self {
        Self {
            confirmation_blocks: config.confirmation_blocks.max(1),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            deadline: Duration::from_secs(config.confirmation_timeout_secs),
        }
    }
}

/// Polling tracker.
#[derive(Debug, Clone)]
pub struct ReceiptTracker<S> {
    source: S,
    settings: TrackerSettings,
}

impl<S: ReceiptSource> ReceiptTracker<S> {
    pub fn new(source: S, settings: TrackerSettings) -> Self {
        Self { source, settings }
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        on_progress: ProgressFn<'_>,
    ) -> Result<Confirmation, TrackingError> {
        let required = self.settings.confirmation_blocks;
        let mut last_phase = None;
        let mut report = |phase: TrackingPhase| {
            if last_phase != Some(phase) {
                last_phase = Some(phase);
                on_progress(phase);
            }
        };

        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let receipt = match self.source.receipt(tx_hash).await {
                Ok(Some(r)) => r,
                Ok(None) => {
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    report(TrackingPhase::NotMined);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed, retrying");
                    continue;
                }
            };

            let current_block = match self.source.latest_block().await {
                Ok(block) => block,
                Err(e) => {
                    tracing::warn!(tx_hash = %tx_hash, error = %e, "Block number poll failed, retrying");
                    continue;
                }
            };
            let tx_block = receipt.block_number.unwrap_or(current_block);

            if !receipt.success {
                return Err(TrackingError::Reverted {
                    block_number: tx_block,
                });
            }

            // The including block counts as the first confirmation.
            let confirmations =
                u32::try_from(current_block.saturating_sub(tx_block) + 1).unwrap_or(u32::MAX);
            report(TrackingPhase::Mined {
                block_number: tx_block,
                confirmations,
                required,
            });

            if confirmations >= required {
                return Ok(Confirmation {
                    block_number: tx_block,
                    confirmations,
                    required,
                    claimed: receipt.claimed,
                });
            }

            tracing::debug!(
                tx_hash = %tx_hash,
                confirmations = confirmations,
                required = required,
                "Waiting for confirmations"
            );
        }
    }
}

impl<S: ReceiptSource> TransactionTracker for ReceiptTracker<S> {
    fn track<'a>(
        &'a self,
        tx_id: &'a TransactionId,
        on_progress: ProgressFn<'a>,
    ) -> BoxFuture<'a, Result<Confirmation, TrackingError>> {
        Box::pin(async move {
            let tx_hash: TxHash = tx_id
                .as_str()
                .parse()
                .map_err(|_| TrackingError::Malformed(tx_id.to_string()))?;

            let deadline = self.settings.deadline;
            let result = match timeout(deadline, self.wait_for_confirmation(tx_hash, on_progress)).await {
                Ok(result) => result,
                Err(_) => Err(TrackingError::Timeout {
                    after_secs: deadline.as_secs(),
                }),
            };

            match &result {
                Ok(confirmation) => {
                    tracing::info!(
                        tx_hash = %tx_hash,
                        block_number = confirmation.block_number,
                        claimer = ?confirmation.claimed.as_ref().map(|c| c.claimer),
                        "Claim confirmed"
                    );
                    metrics::record_tracking("confirmed");
                }
                Err(e) => {
                    tracing::warn!(tx_hash = %tx_hash, error = %e, "Claim tracking failed");
                    metrics::record_tracking(e.kind());
                }
            }
            result
        })
    }
}
