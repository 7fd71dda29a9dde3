//! Scoring session bookkeeping
//!
//! One slot for the current run's session, plus the sessions of ended runs
//! still waiting on a submission, plus the ids whose close is in flight so a
//! session is never closed twice.

use std::collections::{BTreeMap, BTreeSet};

use super::client::SessionHandle;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionSlot {
    #[default]
    Empty,
    /// Open request in flight
    Opening,
    Open(SessionHandle),
}

#[derive(Debug, Clone, Default)]
pub struct Sessions {
    slot: SessionSlot,
    /// Sessions of ended runs, keyed by run, closed once their submission lands
    lingering: BTreeMap<u64, SessionHandle>,
    closing: BTreeSet<String>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> &SessionSlot {
        &self.slot
    }

    pub fn is_empty(&self) -> bool {
        self.slot == SessionSlot::Empty
    }

    pub fn is_opening(&self) -> bool {
        self.slot == SessionSlot::Opening
    }

    pub fn handle(&self) -> Option<&SessionHandle> {
        match &self.slot {
            SessionSlot::Open(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn begin_open(&mut self) {
        self.slot = SessionSlot::Opening;
    }

    pub fn opened(&mut self, handle: SessionHandle) {
        self.slot = SessionSlot::Open(handle);
    }

    pub fn open_failed(&mut self) {
        self.slot = SessionSlot::Empty;
    }

    /// Take the open session for closing. Returns the id to close, or `None`
    /// if no session is open or its close is already in flight. An open
    /// request still in flight is left alone.
    pub fn close(&mut self) -> Option<String> {
        if !matches!(self.slot, SessionSlot::Open(_)) {
            return None;
        }
        match std::mem::take(&mut self.slot) {
            SessionSlot::Open(handle) => self.mark_closing(handle.session_id),
            _ => None,
        }
    }

    /// Drop whatever the slot holds. An open session is returned for closing;
    /// a pending open is forgotten and closed when it lands.
    pub fn abandon(&mut self) -> Option<String> {
        match std::mem::take(&mut self.slot) {
            SessionSlot::Open(handle) => self.mark_closing(handle.session_id),
            SessionSlot::Opening | SessionSlot::Empty => None,
        }
    }

    /// Record an id as closing; `None` if it already is
    pub fn mark_closing(&mut self, session_id: String) -> Option<String> {
        if self.closing.insert(session_id.clone()) {
            Some(session_id)
        } else {
            None
        }
    }

    /// Close call finished (either way); never retried
    pub fn closed(&mut self, session_id: &str) {
        self.closing.remove(session_id);
    }

    pub fn is_closing(&self, session_id: &str) -> bool {
        self.closing.contains(session_id)
    }

    /// Park the current session under `run` until its in-flight submission
    /// resolves. Leaves the slot empty.
    pub fn linger(&mut self, run: u64) {
        if let SessionSlot::Open(handle) = std::mem::take(&mut self.slot) {
            self.lingering.insert(run, handle);
        }
    }

    /// Release a parked session for closing
    pub fn release(&mut self, run: u64) -> Option<String> {
        let handle = self.lingering.remove(&run)?;
        self.mark_closing(handle.session_id)
    }
}
