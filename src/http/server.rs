//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and drain on shutdown
//! - Tear down every claim controller once the server stops

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::contract::ContractReader;
use crate::claim::registry::ClaimRegistry;
use crate::config::schema::ClaimConfig;
use crate::http::handlers;
use crate::lifecycle::shutdown::Shutdown;

/// Live chain access for the read-only routes.
#[derive(Debug, Clone)]
pub struct ChainAccess {
    pub client: BlockchainClient,
    pub reader: ContractReader,
}

pub(crate) struct InnerState {
    pub(crate) config: ClaimConfig,
    pub(crate) registry: ClaimRegistry,
    pub(crate) chain: Option<ChainAccess>,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<InnerState>,
}

impl AppState {
    /// `chain` may be `None`; chain-backed routes then answer 503.
    pub fn new(config: ClaimConfig, registry: ClaimRegistry, chain: Option<ChainAccess>) -> Self {
        Self {
            inner: Arc::new(InnerState {
                config,
                registry,
                chain,
            }),
        }
    }

    pub fn registry(&self) -> &ClaimRegistry {
        &self.inner.registry
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.inner.config.server.request_timeout_secs);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/wallet", get(handlers::wallet))
        .route("/contract", get(handlers::contract))
        .route("/contract/codes/{code}", get(handlers::check_code))
        .route(
            "/claims/{code}",
            get(handlers::get_claim)
                .post(handlers::submit_claim)
                .delete(handlers::remove_claim),
        )
        .route("/claims/{code}/reset", post(handlers::reset_claim))
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// HTTP server for the claim service.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    /// Serve until `shutdown` fires, then tear down every controller.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        self.state.registry().teardown_all();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
