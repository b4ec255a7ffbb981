//! Claim attempt snapshot types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::blockchain::tracker::TrackingPhase;
use crate::blockchain::types::TransactionId;
use crate::claim::classifier::ClassifiedError;

/// Opaque one-time code scanned from a QR artifact.
///
/// Only emptiness is checked here; the contract decides validity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// `None` for an empty code.
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        if code.is_empty() {
            None
        } else {
            Some(Self(code))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one attempt; a reset always produces a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(Uuid);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClaimStatus {
    #[default]
    Idle,
    Submitting,
    AwaitingConfirmation,
    Confirmed,
    Failed,
}

impl ClaimStatus {
    /// A chain call for this attempt is outstanding.
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Submitting | Self::AwaitingConfirmation)
    }

    /// Only an explicit reset leaves this status.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

/// Read-only snapshot of the controller's current attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAttempt {
    pub id: AttemptId,
    pub code: Option<Code>,
    pub status: ClaimStatus,
    pub transaction_id: Option<TransactionId>,
    pub tracking: Option<TrackingPhase>,
    pub failure: Option<ClassifiedError>,
}

impl ClaimAttempt {
    /// A fresh `Idle` attempt.
    pub fn idle() -> Self {
        Self {
            id: AttemptId::new(),
            code: None,
            status: ClaimStatus::Idle,
            transaction_id: None,
            tracking: None,
            failure: None,
        }
    }

    pub(crate) fn submitting(code: Code) -> Self {
        Self {
            code: Some(code),
            status: ClaimStatus::Submitting,
            ..Self::idle()
        }
    }
}

impl Default for ClaimAttempt {
    fn default() -> Self {
        Self::idle()
    }
}
