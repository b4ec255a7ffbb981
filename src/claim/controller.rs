//! Claim lifecycle state machine.
//!
//! # States
//! ```text
//! Idle ──submit──▶ Submitting ──tx id──▶ AwaitingConfirmation ──▶ Confirmed
//!                      │                          │
//!                      └────────error─────────────┴──────────────▶ Failed
//!
//! reset(): any state ──▶ fresh Idle
//! ```
//!
//! # Design Decisions
//! - Submission and tracking run in spawned tasks; dropping a `submit`
//!   future does not cancel the submission
//! - A result is applied only if its attempt ID is still current
//! - The state lock is never held across an `.await`
//! - A panicking submitter or tracker fails the attempt as `Unknown`
//! - Observable only through snapshots; no logging or persistence here

use alloy::primitives::Address;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::blockchain::submitter::ClaimSubmitter;
use crate::blockchain::tracker::{TrackingPhase, TransactionTracker};
use crate::blockchain::types::TransactionId;
use crate::claim::attempt::{AttemptId, ClaimAttempt, ClaimStatus, Code};
use crate::claim::classifier::{ClassifiedError, ErrorClassifier, FailureCategory};
use crate::claim::session::WalletSession;

/// Result of a `submit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Transaction broadcast; confirmation tracking has started.
    Submitted,
    /// Submission failed; the attempt is `Failed`.
    Failed,
    /// Wallet not connected or code empty; nothing changed.
    PreconditionNotMet,
    /// A submission or confirmation is already outstanding; nothing changed.
    AlreadyInFlight,
    /// The attempt is `Confirmed` or `Failed`; reset first.
    NotIdle,
    /// The attempt was reset before its submission resolved.
    Discarded,
}

/// Shared collaborators, cloned into every controller.
#[derive(Clone)]
pub struct ClaimServices {
    pub session: Arc<dyn WalletSession>,
    pub submitter: Arc<dyn ClaimSubmitter>,
    pub tracker: Arc<dyn TransactionTracker>,
    pub classifier: Arc<ErrorClassifier>,
}

impl std::fmt::Debug for ClaimServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimServices")
            .field("session", &self.session.snapshot())
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

struct State {
    attempt: ClaimAttempt,
    /// Submission or tracking task of the current attempt.
    task: Option<AbortHandle>,
}

struct Inner {
    services: ClaimServices,
    state: Mutex<State>,
    updates: watch::Sender<ClaimAttempt>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &State) {
        self.updates.send_replace(state.attempt.clone());
    }

    /// Apply `f` to the current attempt if it is still `id`.
    fn apply(&self, id: AttemptId, f: impl FnOnce(&mut ClaimAttempt)) -> bool {
        let mut state = self.lock();
        if state.attempt.id != id {
            return false;
        }
        f(&mut state.attempt);
        if !state.attempt.status.is_in_flight() {
            state.task = None;
        }
        self.publish(&state);
        true
    }

    fn fail(attempt: &mut ClaimAttempt, failure: ClassifiedError) {
        attempt.status = ClaimStatus::Failed;
        attempt.failure = Some(failure);
    }

    async fn run_submission(
        self: Arc<Self>,
        id: AttemptId,
        code: Code,
        from: Address,
    ) -> SubmitOutcome {
        let result = AssertUnwindSafe(async { self.services.submitter.submit(&code, from).await })
            .catch_unwind()
            .await;

        let mut state = self.lock();
        if state.attempt.id != id {
            return SubmitOutcome::Discarded;
        }

        match result {
            Ok(Ok(tx_id)) => {
                state.attempt.status = ClaimStatus::AwaitingConfirmation;
                state.attempt.transaction_id = Some(tx_id.clone());
                state.attempt.tracking = Some(TrackingPhase::NotMined);
                state.task = Some(Self::spawn_tracking(self.clone(), id, tx_id));
                self.publish(&state);
                SubmitOutcome::Submitted
            }
            Ok(Err(e)) => {
                let failure = self.services.classifier.classify_submission(&e);
                Self::fail(&mut state.attempt, failure);
                state.task = None;
                self.publish(&state);
                SubmitOutcome::Failed
            }
            Err(_) => {
                Self::fail(&mut state.attempt, FailureCategory::Unknown.into());
                state.task = None;
                self.publish(&state);
                SubmitOutcome::Failed
            }
        }
    }

    fn spawn_tracking(inner: Arc<Self>, id: AttemptId, tx_id: TransactionId) -> AbortHandle {
        tokio::spawn(async move {
            let progress = inner.clone();
            let on_progress = move |phase: TrackingPhase| {
                progress.apply(id, |attempt| {
                    if attempt.status == ClaimStatus::AwaitingConfirmation {
                        attempt.tracking = Some(phase);
                    }
                });
            };

            let result = AssertUnwindSafe(async {
                inner.services.tracker.track(&tx_id, &on_progress).await
            })
            .catch_unwind()
            .await;

            let classifier = inner.services.classifier.clone();
            inner.apply(id, |attempt| match result {
                Ok(Ok(confirmation)) => {
                    attempt.status = ClaimStatus::Confirmed;
                    attempt.tracking = Some(confirmation.phase());
                }
                Ok(Err(e)) => Self::fail(attempt, classifier.classify_tracking(&e)),
                Err(_) => Self::fail(attempt, FailureCategory::Unknown.into()),
            });
        })
        .abort_handle()
    }
}

/// Drives one claim surface through its lifecycle.
///
/// At most one attempt is in flight at a time. Dropping the controller
/// aborts any outstanding submission or tracking task.
pub struct ClaimController {
    inner: Arc<Inner>,
}

impl ClaimController {
    pub fn new(services: ClaimServices) -> Self {
        let attempt = ClaimAttempt::idle();
        let (updates, _) = watch::channel(attempt.clone());
        Self {
            inner: Arc::new(Inner {
                services,
                state: Mutex::new(State {
                    attempt,
                    task: None,
                }),
                updates,
            }),
        }
    }

    /// Current attempt snapshot.
    pub fn snapshot(&self) -> ClaimAttempt {
        self.inner.updates.borrow().clone()
    }

    /// Receive every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<ClaimAttempt> {
        self.inner.updates.subscribe()
    }

    /// Whether `submit` would currently be accepted.
    pub fn can_submit(&self, code: &str) -> bool {
        !code.is_empty()
            && self.inner.services.session.snapshot().signing_address().is_some()
            && self.inner.lock().attempt.status == ClaimStatus::Idle
    }

    /// Submit a claim for `code`.
    ///
    /// Resolves once the submission itself resolves; confirmation tracking
    /// continues in the background and shows up in later snapshots.
    pub async fn submit(&self, code: &str) -> SubmitOutcome {
        let Some(code) = Code::new(code) else {
            return SubmitOutcome::PreconditionNotMet;
        };
        let Some(from) = self.inner.services.session.snapshot().signing_address() else {
            return SubmitOutcome::PreconditionNotMet;
        };

        let (id, handle) = {
            let mut state = self.inner.lock();
            if state.attempt.status.is_in_flight() {
                return SubmitOutcome::AlreadyInFlight;
            }
            if state.attempt.status.is_terminal() {
                return SubmitOutcome::NotIdle;
            }

            state.attempt = ClaimAttempt::submitting(code.clone());
            let id = state.attempt.id;
            let handle = tokio::spawn(self.inner.clone().run_submission(id, code, from));
            state.task = Some(handle.abort_handle());
            self.inner.publish(&state);
            (id, handle)
        };

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                let failed = self.inner.apply(id, |attempt| {
                    Inner::fail(attempt, FailureCategory::Unknown.into())
                });
                if failed {
                    SubmitOutcome::Failed
                } else {
                    SubmitOutcome::Discarded
                }
            }
            // Aborted: the attempt was reset meanwhile.
            Err(_) => SubmitOutcome::Discarded,
        }
    }

    /// Return to a fresh `Idle` attempt, abandoning any in-flight work.
    pub fn reset(&self) -> ClaimAttempt {
        let mut state = self.inner.lock();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.attempt = ClaimAttempt::idle();
        self.inner.publish(&state);
        state.attempt.clone()
    }
}

impl Drop for ClaimController {
    fn drop(&mut self) {
        if let Some(task) = self.inner.lock().task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for ClaimController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimController")
            .field("attempt", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::submitter::SubmissionError;
    use crate::blockchain::tracker::{Confirmation, ProgressFn, TrackingError};
    use crate::claim::session::{SessionSnapshot, WatchedSession};
    use alloy::primitives::{address, Address};
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{oneshot, Notify};

    const WALLET: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    /// Submitter returning a fixed result, optionally after a gate opens.
    struct FixedSubmitter {
        result: Result<TransactionId, SubmissionError>,
        gate: Option<Arc<Notify>>,
        calls: AtomicUsize,
    }

    impl ClaimSubmitter for FixedSubmitter {
        fn submit<'a>(
            &'a self,
            _code: &'a Code,
            _from: Address,
        ) -> BoxFuture<'a, Result<TransactionId, SubmissionError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                self.result.clone()
            })
        }
    }

    /// Tracker that reports `Mined` then waits for the test to decide.
    struct ManualTracker {
        outcome: Mutex<Option<oneshot::Receiver<Result<Confirmation, TrackingError>>>>,
    }

    impl TransactionTracker for ManualTracker {
        fn track<'a>(
            &'a self,
            _tx_id: &'a TransactionId,
            on_progress: ProgressFn<'a>,
        ) -> BoxFuture<'a, Result<Confirmation, TrackingError>> {
            let rx = self.outcome.lock().unwrap().take();
            Box::pin(async move {
                on_progress(TrackingPhase::Mined {
                    block_number: 10,
                    confirmations: 1,
                    required: 2,
                });
                match rx {
                    Some(rx) => rx
                        .await
                        .unwrap_or(Err(TrackingError::Timeout { after_secs: 0 })),
                    None => std::future::pending().await,
                }
            })
        }
    }

    /// Submitter whose signing path panics.
    struct CrashingSubmitter;

    impl ClaimSubmitter for CrashingSubmitter {
        fn submit<'a>(
            &'a self,
            _code: &'a Code,
            _from: Address,
        ) -> BoxFuture<'a, Result<TransactionId, SubmissionError>> {
            panic!("signer crashed")
        }
    }

    /// Tracker that panics after its first progress report.
    struct CrashingTracker;

    impl TransactionTracker for CrashingTracker {
        fn track<'a>(
            &'a self,
            _tx_id: &'a TransactionId,
            on_progress: ProgressFn<'a>,
        ) -> BoxFuture<'a, Result<Confirmation, TrackingError>> {
            Box::pin(async move {
                on_progress(TrackingPhase::NotMined);
                tokio::task::yield_now().await;
                panic!("receipt decoder crashed")
            })
        }
    }

    fn controller_with(
        submitter: Arc<dyn ClaimSubmitter>,
        tracker: Arc<dyn TransactionTracker>,
    ) -> ClaimController {
        let (_session_tx, session) = WatchedSession::channel(SessionSnapshot::connected(WALLET));
        ClaimController::new(ClaimServices {
            session: Arc::new(session),
            submitter,
            tracker,
            classifier: Arc::new(ErrorClassifier::new()),
        })
    }

    fn confirmation() -> Confirmation {
        Confirmation {
            block_number: 10,
            confirmations: 2,
            required: 2,
            claimed: None,
        }
    }

    struct Harness {
        controller: ClaimController,
        submitter: Arc<FixedSubmitter>,
        tracker_tx: Option<oneshot::Sender<Result<Confirmation, TrackingError>>>,
        session_tx: watch::Sender<SessionSnapshot>,
    }

    fn harness(result: Result<TransactionId, SubmissionError>, gate: Option<Arc<Notify>>) -> Harness {
        let (session_tx, session) = WatchedSession::channel(SessionSnapshot::connected(WALLET));
        let (tracker_tx, tracker_rx) = oneshot::channel();
        let submitter = Arc::new(FixedSubmitter {
            result,
            gate,
            calls: AtomicUsize::new(0),
        });
        let controller = ClaimController::new(ClaimServices {
            session: Arc::new(session),
            submitter: submitter.clone(),
            tracker: Arc::new(ManualTracker {
                outcome: Mutex::new(Some(tracker_rx)),
            }),
            classifier: Arc::new(ErrorClassifier::new()),
        });
        Harness {
            controller,
            submitter,
            tracker_tx: Some(tracker_tx),
            session_tx,
        }
    }

    async fn settle(controller: &ClaimController) -> ClaimAttempt {
        controller
            .subscribe()
            .wait_for(|a| a.status.is_terminal())
            .await
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn test_confirmed_flow() {
        let mut h = harness(Ok(TransactionId::new("0xTX1")), None);

        assert_eq!(h.controller.submit("ABC123").await, SubmitOutcome::Submitted);
        let pending = h.controller.snapshot();
        assert_eq!(pending.status, ClaimStatus::AwaitingConfirmation);
        assert_eq!(pending.transaction_id, Some(TransactionId::new("0xTX1")));

        h.tracker_tx.take().unwrap().send(Ok(confirmation())).unwrap();
        let done = settle(&h.controller).await;
        assert_eq!(done.status, ClaimStatus::Confirmed);
        assert_eq!(done.transaction_id, Some(TransactionId::new("0xTX1")));
        assert_eq!(done.failure, None);
        assert_eq!(done.id, pending.id);
    }

    #[tokio::test]
    async fn test_progress_is_visible_while_pending() {
        let h = harness(Ok(TransactionId::new("0xTX1")), None);
        h.controller.submit("ABC123").await;

        let mut rx = h.controller.subscribe();
        let snapshot = rx
            .wait_for(|a| matches!(a.tracking, Some(TrackingPhase::Mined { .. })))
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot.status, ClaimStatus::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn test_submission_failure_is_classified() {
        let h = harness(
            Err(SubmissionError::Rejected("execution reverted: Invalid Code".into())),
            None,
        );

        assert_eq!(h.controller.submit("ABC123").await, SubmitOutcome::Failed);
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.status, ClaimStatus::Failed);
        assert_eq!(
            snapshot.failure.map(|f| f.category),
            Some(FailureCategory::CodeAlreadyClaimed)
        );
        assert_eq!(snapshot.transaction_id, None);
    }

    #[tokio::test]
    async fn test_tracking_revert_and_timeout_fail() {
        let mut h = harness(Ok(TransactionId::new("0xTX1")), None);
        h.controller.submit("ABC123").await;
        h.tracker_tx
            .take()
            .unwrap()
            .send(Err(TrackingError::Reverted { block_number: 10 }))
            .unwrap();
        let done = settle(&h.controller).await;
        assert_eq!(
            done.failure.map(|f| f.category),
            Some(FailureCategory::TransactionReverted)
        );

        let mut h = harness(Ok(TransactionId::new("0xTX2")), None);
        h.controller.submit("ABC123").await;
        h.tracker_tx
            .take()
            .unwrap()
            .send(Err(TrackingError::Timeout { after_secs: 180 }))
            .unwrap();
        let done = settle(&h.controller).await;
        assert_eq!(
            done.failure.map(|f| f.category),
            Some(FailureCategory::TrackingTimeout)
        );
    }

    #[tokio::test]
    async fn test_disconnected_wallet_is_precondition() {
        let h = harness(Ok(TransactionId::new("0xTX1")), None);
        h.session_tx.send_replace(SessionSnapshot::disconnected());

        assert!(!h.controller.can_submit("X"));
        assert_eq!(h.controller.submit("X").await, SubmitOutcome::PreconditionNotMet);
        assert_eq!(h.controller.snapshot().status, ClaimStatus::Idle);
        assert_eq!(h.submitter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_code_is_precondition() {
        let h = harness(Ok(TransactionId::new("0xTX1")), None);
        assert_eq!(h.controller.submit("").await, SubmitOutcome::PreconditionNotMet);
        assert_eq!(h.submitter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_double_submit_is_noop() {
        let gate = Arc::new(Notify::new());
        let h = harness(Ok(TransactionId::new("0xTX1")), Some(gate.clone()));
        let controller = Arc::new(h.controller);

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("ABC123").await }
        });
        controller
            .subscribe()
            .wait_for(|a| a.status == ClaimStatus::Submitting)
            .await
            .unwrap();

        let before = controller.snapshot();
        assert_eq!(controller.submit("ABC123").await, SubmitOutcome::AlreadyInFlight);
        assert_eq!(controller.snapshot(), before);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), SubmitOutcome::Submitted);

        // Still a no-op while awaiting confirmation.
        assert_eq!(controller.submit("ABC123").await, SubmitOutcome::AlreadyInFlight);
        assert_eq!(h.submitter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_terminal_requires_reset() {
        let h = harness(Err(SubmissionError::Transport("connection refused".into())), None);
        assert_eq!(h.controller.submit("ABC123").await, SubmitOutcome::Failed);
        assert_eq!(
            h.controller.snapshot().failure.map(|f| f.category),
            Some(FailureCategory::Unknown)
        );

        assert_eq!(h.controller.submit("ABC123").await, SubmitOutcome::NotIdle);
        h.controller.reset();
        assert_eq!(h.controller.submit("ABC123").await, SubmitOutcome::Failed);
        assert_eq!(h.submitter.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reset_discards_late_tracker_result() {
        let mut h = harness(Ok(TransactionId::new("0xTX1")), None);
        h.controller.submit("ABC123").await;
        let old = h.controller.snapshot();

        let fresh = h.controller.reset();
        assert_eq!(fresh.status, ClaimStatus::Idle);
        assert_ne!(fresh.id, old.id);

        // The tracking task is gone; a late success changes nothing.
        let _ = h.tracker_tx.take().unwrap().send(Ok(confirmation()));
        tokio::task::yield_now().await;
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot, fresh);
        assert_eq!(snapshot.transaction_id, None);
        assert_eq!(snapshot.failure, None);
    }

    #[tokio::test]
    async fn test_reset_during_submission_discards_result() {
        let gate = Arc::new(Notify::new());
        let h = harness(Ok(TransactionId::new("0xTX1")), Some(gate.clone()));
        let controller = Arc::new(h.controller);

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("ABC123").await }
        });
        controller
            .subscribe()
            .wait_for(|a| a.status == ClaimStatus::Submitting)
            .await
            .unwrap();

        let fresh = controller.reset();
        gate.notify_one();

        assert_eq!(pending.await.unwrap(), SubmitOutcome::Discarded);
        assert_eq!(controller.snapshot(), fresh);
    }

    #[tokio::test]
    async fn test_reset_from_any_state_is_clean() {
        let h = harness(Err(SubmissionError::Rejected("execution reverted".into())), None);
        for _ in 0..2 {
            let fresh = h.controller.reset();
            assert_eq!(fresh.status, ClaimStatus::Idle);
            assert_eq!(fresh.code, None);
            assert_eq!(fresh.transaction_id, None);
            assert_eq!(fresh.failure, None);
            h.controller.submit("ABC123").await;
        }
    }

    #[tokio::test]
    async fn test_panicking_submitter_fails_the_attempt() {
        let controller = controller_with(Arc::new(CrashingSubmitter), Arc::new(CrashingTracker));

        assert_eq!(controller.submit("ABC123").await, SubmitOutcome::Failed);
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.status, ClaimStatus::Failed);
        assert_eq!(snapshot.failure.map(|f| f.category), Some(FailureCategory::Unknown));

        // Not stuck in flight: the usual reset-and-retry path applies.
        assert_eq!(controller.submit("ABC123").await, SubmitOutcome::NotIdle);
        controller.reset();
        assert_eq!(controller.submit("ABC123").await, SubmitOutcome::Failed);
    }

    #[tokio::test]
    async fn test_panicking_tracker_fails_the_attempt() {
        let submitter = Arc::new(FixedSubmitter {
            result: Ok(TransactionId::new("0xTX1")),
            gate: None,
            calls: AtomicUsize::new(0),
        });
        let controller = controller_with(submitter.clone(), Arc::new(CrashingTracker));

        assert_eq!(controller.submit("ABC123").await, SubmitOutcome::Submitted);
        let done = settle(&controller).await;
        assert_eq!(done.status, ClaimStatus::Failed);
        assert_eq!(done.failure.map(|f| f.category), Some(FailureCategory::Unknown));
        assert_eq!(done.transaction_id, Some(TransactionId::new("0xTX1")));

        assert_eq!(controller.submit("ABC123").await, SubmitOutcome::NotIdle);
        controller.reset();
        assert_eq!(controller.submit("ABC123").await, SubmitOutcome::Submitted);
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 2);
    }
}
