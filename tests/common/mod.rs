//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use alloy::primitives::{address, Address};
use futures_util::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch, Notify};

use qr_claim::blockchain::submitter::{ClaimSubmitter, SubmissionError};
use qr_claim::blockchain::tracker::{
    Confirmation, ProgressFn, ReceiptSource, TrackingError, TrackingPhase, TransactionTracker,
};
use qr_claim::blockchain::types::{BlockchainError, BlockchainResult, ReceiptSummary, TransactionId};
use qr_claim::claim::{ClaimServices, Code, ErrorClassifier, SessionSnapshot, WatchedSession};

pub const WALLET: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

pub const TX_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

/// Replays queued results; the last one repeats.
pub struct ScriptedSubmitter {
    results: Mutex<VecDeque<Result<TransactionId, SubmissionError>>>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    codes: Mutex<Vec<String>>,
}

impl ScriptedSubmitter {
    pub fn new(results: Vec<Result<TransactionId, SubmissionError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            gate: None,
            calls: AtomicUsize::new(0),
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(tx: &str) -> Self {
        Self::new(vec![Ok(TransactionId::new(tx))])
    }

    pub fn err(err: SubmissionError) -> Self {
        Self::new(vec![Err(err)])
    }

    /// Hold every submission until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }
}

impl ClaimSubmitter for ScriptedSubmitter {
    fn submit<'a>(
        &'a self,
        code: &'a Code,
        _from: Address,
    ) -> BoxFuture<'a, Result<TransactionId, SubmissionError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.codes.lock().unwrap().push(code.to_string());
        let result = {
            let mut results = self.results.lock().unwrap();
            if results.len() > 1 {
                results.pop_front().unwrap()
            } else {
                results.front().cloned().unwrap()
            }
        };
        Box::pin(async move {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            result
        })
    }
}

type Outcome = Result<Confirmation, TrackingError>;

/// Tracker whose results the test delivers by hand, one per `track` call.
#[derive(Default)]
pub struct ManualTracker {
    pending: Mutex<VecDeque<oneshot::Receiver<Outcome>>>,
    tracked: Mutex<Vec<TransactionId>>,
}

impl ManualTracker {
    /// Queue the result channel for the next `track` call.
    pub fn expect(&self) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push_back(rx);
        tx
    }

    pub fn tracked(&self) -> Vec<TransactionId> {
        self.tracked.lock().unwrap().clone()
    }
}

impl TransactionTracker for ManualTracker {
    fn track<'a>(
        &'a self,
        tx_id: &'a TransactionId,
        on_progress: ProgressFn<'a>,
    ) -> BoxFuture<'a, Outcome> {
        self.tracked.lock().unwrap().push(tx_id.clone());
        let rx = self.pending.lock().unwrap().pop_front();
        Box::pin(async move {
            on_progress(TrackingPhase::NotMined);
            match rx {
                Some(rx) => match rx.await {
                    Ok(outcome) => outcome,
                    Err(_) => std::future::pending().await,
                },
                None => std::future::pending().await,
            }
        })
    }
}

/// Yield until `tracker` has seen `count` track calls.
pub async fn until_tracked(tracker: &ManualTracker, count: usize) {
    while tracker.tracked().len() < count {
        tokio::task::yield_now().await;
    }
}

pub fn confirmed(block_number: u64) -> Confirmation {
    Confirmation {
        block_number,
        confirmations: 1,
        required: 1,
        claimed: None,
    }
}

/// Chain answers for `ReceiptTracker`, replayed one per poll.
pub struct ScriptedChain {
    receipts: Mutex<VecDeque<Option<ReceiptSummary>>>,
    blocks: Mutex<VecDeque<u64>>,
    /// Number of leading receipt polls that fail at the transport level.
    failures: AtomicUsize,
}

impl ScriptedChain {
    pub fn new(receipts: Vec<Option<ReceiptSummary>>, blocks: Vec<u64>) -> Self {
        Self {
            receipts: Mutex::new(receipts.into()),
            blocks: Mutex::new(blocks.into()),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn failing_first(self, polls: usize) -> Self {
        self.failures.store(polls, Ordering::SeqCst);
        self
    }
}

fn pop_or_repeat<T: Clone>(queue: &Mutex<VecDeque<T>>) -> T {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        queue.front().cloned().unwrap()
    }
}

impl ReceiptSource for ScriptedChain {
    fn latest_block(&self) -> BoxFuture<'_, BlockchainResult<u64>> {
        Box::pin(async move { Ok(pop_or_repeat(&self.blocks)) })
    }

    fn receipt(
        &self,
        _tx_hash: alloy::primitives::TxHash,
    ) -> BoxFuture<'_, BlockchainResult<Option<ReceiptSummary>>> {
        Box::pin(async move {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(BlockchainError::Rpc("connection reset".to_string()));
            }
            Ok(pop_or_repeat(&self.receipts))
        })
    }
}

pub fn mined(block_number: u64, success: bool) -> Option<ReceiptSummary> {
    Some(ReceiptSummary {
        success,
        block_number: Some(block_number),
        claimed: None,
    })
}

/// Services around the given submitter and tracker, with a wallet session
/// the test controls.
pub fn services(
    submitter: Arc<dyn ClaimSubmitter>,
    tracker: Arc<dyn TransactionTracker>,
    session: SessionSnapshot,
) -> (watch::Sender<SessionSnapshot>, ClaimServices) {
    let (session_tx, session) = WatchedSession::channel(session);
    let services = ClaimServices {
        session: Arc::new(session),
        submitter,
        tracker,
        classifier: Arc::new(ErrorClassifier::new()),
    };
    (session_tx, services)
}
