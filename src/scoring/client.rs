//! Scoring collaborator contract
//!
//! The engine never calls these directly; the runtime runs them as tasks and
//! posts their results back as completions.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque player identity (a wallet address in the hosted game)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiers issued when a scoring session opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub session_id: String,
    pub session_token: String,
}

/// One batched score delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub player: PlayerId,
    pub session_id: String,
    pub score_amount: u64,
}

/// Acknowledgement for an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub score_amount: u64,
}

/// Collaborator-side failures. None of these reach the game state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("scoring service unreachable: {0}")]
    Transport(String),

    #[error("scoring service rejected the request: {0}")]
    Rejected(String),

    #[error("unknown scoring session {0}")]
    UnknownSession(String),
}

/// Request/response contract of the external scoring service
pub trait ScoringClient: Send + Sync + 'static {
    /// Open a session for one run
    fn open_session(
        &self,
        player: PlayerId,
    ) -> impl Future<Output = Result<SessionHandle, ScoringError>> + Send;

    /// Close a session. Closing an unknown or closed session succeeds.
    fn close_session(
        &self,
        session_id: String,
    ) -> impl Future<Output = Result<(), ScoringError>> + Send;

    /// Credit a score delta against an open session
    fn submit_score(
        &self,
        submission: ScoreSubmission,
    ) -> impl Future<Output = Result<TransactionReceipt, ScoringError>> + Send;

    /// Lifetime total credited to the player
    fn player_total_score(
        &self,
        player: PlayerId,
    ) -> impl Future<Output = Result<u64, ScoringError>> + Send;
}
