//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key)
//!     → wallet.rs (key loading, signing)
//!     → client.rs (failover RPC with timeouts)
//!     → contract.rs (claim contract ABI, view calls)
//!     → submitter.rs (build, sign, broadcast claimUSDC)
//!     → tracker.rs (receipt polling to confirmation depth)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or raw codes; codes are logged by hash
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod contract;
pub mod submitter;
pub mod tracker;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use types::{BlockchainConfig, BlockchainError, ChainId, TransactionId};
pub use wallet::Wallet;
