//! Score reconciliation and the external scoring service
//!
//! Nothing here touches the simulation; the engine feeds score points in and
//! routes collaborator results back.

pub mod client;
pub mod ledger;
pub mod local;
pub mod session;

pub use client::{
    PlayerId, ScoreSubmission, ScoringClient, ScoringError, SessionHandle, TransactionReceipt,
};
pub use ledger::{Batch, ScoreLedger};
pub use local::LocalScoringClient;
pub use session::{SessionSlot, Sessions};
