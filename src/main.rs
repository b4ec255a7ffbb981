//! QR code USDC claim service.
//!
//! ```text
//!     Client ──HTTP──▶ http (axum) ──▶ claim registry ──▶ ClaimController
//!                                                            │
//!                          ┌─────────────────────────────────┤
//!                          ▼                                 ▼
//!                  ContractSubmitter                  ReceiptTracker
//!                  (sign + broadcast)              (poll receipts, depth)
//!                          │                                 │
//!                          └───────────▶ BlockchainClient ◀──┘
//!                                        (failover JSON-RPC)
//! ```

use alloy::primitives::Address;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use qr_claim::blockchain::contract::ContractReader;
use qr_claim::blockchain::submitter::{ClaimSubmitter, ContractSubmitter, NoSigner};
use qr_claim::blockchain::tracker::{ChainReceipts, ReceiptTracker, TrackerSettings};
use qr_claim::blockchain::{BlockchainClient, Wallet};
use qr_claim::claim::{
    ClaimRegistry, ClaimServices, ErrorClassifier, SignerSession, WalletSession, WatchedSession,
};
use qr_claim::config::{load_config, ClaimConfig};
use qr_claim::http::{AppState, ChainAccess, HttpServer};
use qr_claim::lifecycle::{signals, Shutdown};
use qr_claim::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "qr-claim", version, about = "QR code USDC claim service")]
struct Args {
    /// Path to a TOML config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ClaimConfig::default(),
    };

    logging::init_tracing(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "qr-claim starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        rpc_url = %config.blockchain.rpc_url,
        chain_id = config.blockchain.chain_id,
        contract = %config.contract.address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let contract: Address = config.contract.address.parse()?;
    let client = BlockchainClient::new(config.blockchain.clone()).await?;

    let (session, submitter): (Arc<dyn WalletSession>, Arc<dyn ClaimSubmitter>) =
        match Wallet::from_env(config.blockchain.chain_id) {
            Ok(wallet) => {
                tracing::info!(address = %wallet.address(), "Signing wallet loaded");
                (
                    Arc::new(SignerSession::new(&wallet)),
                    Arc::new(ContractSubmitter::new(&config.blockchain, &wallet, contract)?),
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "No signing wallet; claims are disabled");
                (Arc::new(WatchedSession::disconnected()), Arc::new(NoSigner))
            }
        };

    let tracker = ReceiptTracker::new(
        ChainReceipts::new(client.clone(), contract),
        TrackerSettings::from(&config.blockchain),
    );

    let registry = ClaimRegistry::with_capacity(
        ClaimServices {
            session,
            submitter,
            tracker: Arc::new(tracker),
            classifier: Arc::new(ErrorClassifier::from_config(&config.classifier.rules)),
        },
        config.server.max_claims,
    );

    let chain = ChainAccess {
        reader: ContractReader::new(client.clone(), contract),
        client,
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(AppState::new(config, registry, Some(chain)));
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
