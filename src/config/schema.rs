//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the claim service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::claim::classifier::FailureCategory;

/// Root configuration for the claim service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClaimConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Chain connection and confirmation settings.
    pub blockchain: BlockchainConfig,

    /// Claim contract and reward settings.
    pub contract: ContractConfig,

    /// Extra error classification rules.
    pub classifier: ClassifierConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Most claim controllers held at once; settled ones are evicted first.
    pub max_claims: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_claims: 10_000,
        }
    }
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (8453 for Base mainnet, 84532 for Base Sepolia).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations required for finality.
    pub confirmation_blocks: u32,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// How long to wait for a submitted claim to confirm, in seconds.
    pub confirmation_timeout_secs: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://mainnet.base.org".to_string(),
            failover_urls: Vec::new(),
            chain_id: 8453,
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            poll_interval_ms: 2000,
            confirmation_timeout_secs: 180,
        }
    }
}

/// Claim contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Address of the QR code claim contract.
    pub address: String,

    /// Symbol of the settlement token.
    pub token_symbol: String,

    /// Decimals of the settlement token.
    pub token_decimals: u8,

    /// Reward paid per code, in whole tokens.
    pub reward_amount: String,

    /// Explorer prefix; the transaction hash is appended.
    pub explorer_tx_url: String,
}

impl ContractConfig {
    /// Human readable reward, e.g. "1 USDC".
    pub fn reward_label(&self) -> String {
        format!("{} {}", self.reward_amount, self.token_symbol)
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: "0x916C587f835708531621bD4FB42d25a3518370e2".to_string(),
            token_symbol: "USDC".to_string(),
            token_decimals: 6,
            reward_amount: "1".to_string(),
            explorer_tx_url: "https://basescan.org/tx/".to_string(),
        }
    }
}

/// Extra classification rules, evaluated before the built-in ones.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClassifierConfig {
    pub rules: Vec<ClassifierRuleConfig>,
}

/// One configured classification rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierRuleConfig {
    /// Category assigned when any pattern matches.
    pub category: FailureCategory,

    /// Case-insensitive substrings matched against the raw error text.
    pub patterns: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log formatter.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
