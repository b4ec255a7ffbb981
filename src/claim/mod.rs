//! QR code claim flow.
//!
//! # Modules
//! - `attempt`: Attempt snapshot, status and identity
//! - `classifier`: Raw error text to user-facing category
//! - `controller`: Lifecycle state machine
//! - `registry`: Controllers keyed by code
//! - `session`: Wallet session boundary
//! - `view`: Pure projection for rendering

pub mod attempt;
pub mod classifier;
pub mod controller;
pub mod registry;
pub mod session;
pub mod view;

pub use attempt::{AttemptId, ClaimAttempt, ClaimStatus, Code};
pub use classifier::{ClassificationRule, ClassifiedError, ErrorClassifier, FailureCategory};
pub use controller::{ClaimController, ClaimServices, SubmitOutcome};
pub use registry::ClaimRegistry;
pub use session::{SessionSnapshot, SignerSession, WalletSession, WatchedSession};
pub use view::ClaimView;
