//! In-process scoring service
//!
//! Keeps sessions and per-player totals in memory. Used by the native demo
//! and by tests, which can inject latency and failures.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::client::{
    PlayerId, ScoreSubmission, ScoringClient, ScoringError, SessionHandle, TransactionReceipt,
};

#[derive(Debug, Default)]
struct Inner {
    next_session: u64,
    next_tx: u64,
    open: BTreeMap<String, PlayerId>,
    closed: Vec<String>,
    totals: BTreeMap<PlayerId, u64>,
    accepted: Vec<ScoreSubmission>,
    attempts: usize,
    fail_submissions: u32,
    fail_open: bool,
    fail_close: bool,
}

#[derive(Debug, Default)]
pub struct LocalScoringClient {
    inner: Mutex<Inner>,
    latency: Duration,
}

impl LocalScoringClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn respond(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Fail the next `n` submissions with a transport error
    pub fn fail_next_submissions(&self, n: u32) {
        self.lock().fail_submissions = n;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.lock().fail_close = fail;
    }

    /// Submissions that were credited, in arrival order
    pub fn accepted(&self) -> Vec<ScoreSubmission> {
        self.lock().accepted.clone()
    }

    /// Every submission call, including failed ones
    pub fn submit_attempts(&self) -> usize {
        self.lock().attempts
    }

    pub fn open_sessions(&self) -> Vec<String> {
        self.lock().open.keys().cloned().collect()
    }

    /// Close calls in arrival order
    pub fn closed_sessions(&self) -> Vec<String> {
        self.lock().closed.clone()
    }

    pub fn total_for(&self, player: &PlayerId) -> u64 {
        self.lock().totals.get(player).copied().unwrap_or(0)
    }
}

impl ScoringClient for LocalScoringClient {
    fn open_session(
        &self,
        player: PlayerId,
    ) -> impl Future<Output = Result<SessionHandle, ScoringError>> + Send {
        async move {
            self.respond().await;
            let mut inner = self.lock();
            if inner.fail_open {
                return Err(ScoringError::Transport("session service down".into()));
            }
            inner.next_session += 1;
            let handle = SessionHandle {
                session_id: format!("session-{}", inner.next_session),
                session_token: format!("token-{}-{}", player, inner.next_session),
            };
            inner.open.insert(handle.session_id.clone(), player);
            Ok(handle)
        }
    }

    fn close_session(
        &self,
        session_id: String,
    ) -> impl Future<Output = Result<(), ScoringError>> + Send {
        async move {
            self.respond().await;
            let mut inner = self.lock();
            inner.closed.push(session_id.clone());
            if inner.fail_close {
                return Err(ScoringError::Transport("close timed out".into()));
            }
            inner.open.remove(&session_id);
            Ok(())
        }
    }

    fn submit_score(
        &self,
        submission: ScoreSubmission,
    ) -> impl Future<Output = Result<TransactionReceipt, ScoringError>> + Send {
        async move {
            self.respond().await;
            let mut inner = self.lock();
            inner.attempts += 1;
            if inner.fail_submissions > 0 {
                inner.fail_submissions -= 1;
                return Err(ScoringError::Transport("submission dropped".into()));
            }
            match inner.open.get(&submission.session_id) {
                Some(owner) if *owner == submission.player => {}
                Some(_) => {
                    return Err(ScoringError::Rejected(
                        "session belongs to another player".into(),
                    ));
                }
                None => return Err(ScoringError::UnknownSession(submission.session_id)),
            }
            if submission.score_amount == 0 {
                return Err(ScoringError::Rejected("empty score delta".into()));
            }

            inner.next_tx += 1;
            let receipt = TransactionReceipt {
                transaction_hash: format!("0x{:064x}", inner.next_tx),
                score_amount: submission.score_amount,
            };
            *inner.totals.entry(submission.player.clone()).or_insert(0) += submission.score_amount;
            inner.accepted.push(submission);
            Ok(receipt)
        }
    }

    fn player_total_score(
        &self,
        player: PlayerId,
    ) -> impl Future<Output = Result<u64, ScoringError>> + Send {
        async move {
            self.respond().await;
            Ok(self.total_for(&player))
        }
    }
}
