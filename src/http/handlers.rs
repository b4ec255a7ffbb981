//! Route handlers.

use alloy::primitives::U256;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::blockchain::contract::ContractDescriptor;
use crate::claim::attempt::ClaimAttempt;
use crate::claim::controller::SubmitOutcome;
use crate::claim::view::ClaimView;
use crate::http::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    /// `None` when the service runs without chain access.
    pub rpc_healthy: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletStatus {
    pub connected: bool,
    pub address: Option<String>,
    pub display_address: Option<String>,
}

/// Body of every `/claims/{code}` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub outcome: Option<SubmitOutcome>,
    pub view: ClaimView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContractStatus {
    pub descriptor: serde_json::Value,
    pub claimable_amount: Option<String>,
    pub usdc_balance: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CodeCheck {
    pub code: String,
    pub valid: bool,
}

fn view(state: &AppState, code: &str, attempt: &ClaimAttempt) -> ClaimView {
    ClaimView::project(
        code,
        attempt,
        state.registry().services().session.snapshot(),
        &state.inner.config.contract,
    )
}

/// HTTP status for a submit outcome.
pub fn outcome_status(outcome: SubmitOutcome) -> StatusCode {
    match outcome {
        SubmitOutcome::Submitted => StatusCode::ACCEPTED,
        SubmitOutcome::Failed => StatusCode::OK,
        SubmitOutcome::PreconditionNotMet => StatusCode::PRECONDITION_FAILED,
        SubmitOutcome::AlreadyInFlight | SubmitOutcome::NotIdle | SubmitOutcome::Discarded => {
            StatusCode::CONFLICT
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let rpc_healthy = match &state.inner.chain {
        Some(chain) => Some(chain.client.is_healthy().await),
        None => None,
    };
    let status = if rpc_healthy == Some(false) {
        "degraded"
    } else {
        "ok"
    };
    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rpc_healthy,
    })
}

pub async fn wallet(State(state): State<AppState>) -> Json<WalletStatus> {
    let session = state.registry().services().session.snapshot();
    Json(WalletStatus {
        connected: session.signing_address().is_some(),
        address: session.address.map(|a| a.to_checksum(None)),
        display_address: session.display_address(),
    })
}

/// Read-only: a code without a controller reads as a fresh idle attempt.
pub async fn get_claim(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Json<ClaimResponse> {
    let attempt = match state.registry().get(&code) {
        Some(controller) => controller.snapshot(),
        None => ClaimAttempt::idle(),
    };
    Json(ClaimResponse {
        outcome: None,
        view: view(&state, &code, &attempt),
    })
}

pub async fn submit_claim(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    let Some(controller) = state.registry().get_or_create(&code) else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many claims in flight").into_response();
    };
    let outcome = controller.submit(&code).await;
    tracing::debug!(?outcome, "Claim submit handled");

    let body = ClaimResponse {
        outcome: Some(outcome),
        view: view(&state, &code, &controller.snapshot()),
    };
    (outcome_status(outcome), Json(body)).into_response()
}

pub async fn reset_claim(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Json<ClaimResponse> {
    let attempt = match state.registry().get(&code) {
        Some(controller) => {
            controller.reset();
            controller.snapshot()
        }
        None => ClaimAttempt::idle(),
    };
    Json(ClaimResponse {
        outcome: None,
        view: view(&state, &code, &attempt),
    })
}

pub async fn remove_claim(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> StatusCode {
    if state.registry().remove(&code) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

fn amount(result: Result<U256, impl std::fmt::Display>, what: &str) -> Option<String> {
    match result {
        Ok(value) => Some(value.to_string()),
        Err(e) => {
            tracing::warn!(error = %e, what, "Contract read failed");
            None
        }
    }
}

pub async fn contract(State(state): State<AppState>) -> impl IntoResponse {
    let address = match state.inner.config.contract.address.parse() {
        Ok(address) => address,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid contract address").into_response()
        }
    };
    let descriptor = match serde_json::to_value(ContractDescriptor::new(address)) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize contract descriptor");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let (claimable_amount, usdc_balance) = match &state.inner.chain {
        Some(chain) => (
            amount(chain.reader.claimable_amount().await, "claimableAmount"),
            amount(chain.reader.usdc_balance().await, "getUSDCBalance"),
        ),
        None => (None, None),
    };

    Json(ContractStatus {
        descriptor,
        claimable_amount,
        usdc_balance,
    })
    .into_response()
}

pub async fn check_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    let Some(chain) = &state.inner.chain else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Chain access disabled").into_response();
    };

    match chain.reader.is_code_valid(&code).await {
        Ok(valid) => Json(CodeCheck { code, valid }).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "isCodeValid failed");
            (StatusCode::BAD_GATEWAY, "Contract read failed").into_response()
        }
    }
}
