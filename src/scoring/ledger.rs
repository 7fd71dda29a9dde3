//! Score reconciliation
//!
//! Tracks the locally confirmed score against what the scoring service has
//! acknowledged. Deltas are batched behind a single debounce deadline and at
//! most one submission is in flight at a time.
//!
//! Invariant: `submitted <= local`.

use serde::{Deserialize, Serialize};

/// A submission the caller should send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Local score this submission brings the service up to
    pub target: u64,
    /// `target - submitted` at the time of sending
    pub delta: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreLedger {
    debounce_ms: f64,
    local: u64,
    submitted: u64,
    /// Target of the submission currently in flight
    in_flight: Option<u64>,
    /// The one pending debounce deadline
    deadline: Option<f64>,
    /// Remaining tries for the end-of-run flush, once requested
    final_attempts: Option<u32>,
}

impl ScoreLedger {
    pub fn new(debounce_ms: f64) -> Self {
        Self {
            debounce_ms,
            local: 0,
            submitted: 0,
            in_flight: None,
            deadline: None,
            final_attempts: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.debounce_ms);
    }

    pub fn local(&self) -> u64 {
        self.local
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Score not yet acknowledged
    pub fn pending(&self) -> u64 {
        self.local - self.submitted
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Nothing in flight and nothing more will be sent: everything is
    /// acknowledged, or the final tries ran out.
    pub fn is_settled(&self) -> bool {
        self.in_flight.is_none()
            && (self.pending() == 0 || self.final_attempts.is_some_and(|n| n == 0))
    }

    /// Count one confirmed point and restart the debounce window
    pub fn record_point(&mut self, now_ms: f64) {
        self.local += 1;
        self.deadline = Some(now_ms + self.debounce_ms);
    }

    /// Consume the debounce deadline if it has passed
    pub fn take_due(&mut self, now_ms: f64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Switch to end-of-run mode: cancel the debounce and allow `attempts`
    /// final submissions.
    pub fn request_final(&mut self, attempts: u32) {
        self.deadline = None;
        self.final_attempts = Some(attempts);
    }

    pub fn is_final(&self) -> bool {
        self.final_attempts.is_some()
    }

    /// Start a submission of everything pending. `None` when there is
    /// nothing to send, one is already in flight, or final tries ran out.
    pub fn begin(&mut self) -> Option<Batch> {
        if self.in_flight.is_some() || self.local <= self.submitted {
            return None;
        }
        if let Some(attempts) = self.final_attempts.as_mut() {
            if *attempts == 0 {
                return None;
            }
            *attempts -= 1;
        }
        self.in_flight = Some(self.local);
        Some(Batch {
            target: self.local,
            delta: self.local - self.submitted,
        })
    }

    /// The service credited the batch that brought it up to `target`.
    ///
    /// `submitted` takes the sent value, not the current local score, so
    /// points earned while the request was in flight stay pending.
    pub fn acknowledge(&mut self, target: u64) {
        self.submitted = self.submitted.max(target.min(self.local));
        self.in_flight = None;
    }

    /// The batch failed; its delta rolls into the next one
    pub fn reject(&mut self) {
        self.in_flight = None;
    }
}
