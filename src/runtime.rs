//! Async driver
//!
//! Wraps an [`Engine`] and runs its effects as tokio tasks against a
//! [`ScoringClient`]. Each task posts its [`Completion`] back over a channel;
//! the frame loop drains the channel without ever awaiting, so a slow
//! collaborator cannot stall tile movement.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::{Completion, Effect, Engine, EngineError, Event, GameSnapshot};
use crate::scoring::ScoringClient;
use crate::sim::{Tap, TapOutcome};

pub struct Runtime<C: ScoringClient> {
    engine: Engine,
    client: Arc<C>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    /// Spawned calls whose completion has not been applied yet
    outstanding: usize,
}

impl<C: ScoringClient> Runtime<C> {
    /// Must be used from within a tokio runtime
    pub fn new(engine: Engine, client: Arc<C>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            engine,
            client,
            tx,
            rx,
            outstanding: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn start(&mut self, now_ms: f64) -> Result<(), EngineError> {
        let result = self.engine.start(now_ms);
        self.dispatch();
        result
    }

    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.engine.pause()
    }

    pub fn resume(&mut self, now_ms: f64) -> Result<(), EngineError> {
        self.engine.resume(now_ms)
    }

    pub fn toggle_pause(&mut self, now_ms: f64) -> Result<(), EngineError> {
        self.engine.toggle_pause(now_ms)
    }

    pub fn set_visible(&mut self, visible: bool, now_ms: f64) {
        self.engine.set_visible(visible, now_ms);
    }

    pub fn tap(&mut self, input: Tap, now_ms: f64) -> TapOutcome {
        let outcome = self.engine.tap(input, now_ms);
        self.dispatch();
        outcome
    }

    pub fn reset(&mut self, seed: u64) -> Result<(), EngineError> {
        let result = self.engine.reset(seed);
        self.dispatch();
        result
    }

    /// Apply finished calls, step the game, send new calls
    pub fn frame(&mut self, now_ms: f64) {
        self.pump();
        self.engine.frame(now_ms);
        self.dispatch();
    }

    /// Apply every completion that has already arrived. Never waits.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Wait until every spawned call, and every call those trigger, is applied
    pub async fn settle(&mut self) {
        while self.outstanding > 0 {
            match self.rx.recv().await {
                Some(completion) => self.apply(completion),
                None => break,
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.engine.drain_events()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.engine.snapshot()
    }

    fn apply(&mut self, completion: Completion) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.engine.apply(completion);
        self.dispatch();
    }

    fn dispatch(&mut self) {
        for effect in self.engine.take_effects() {
            let client = Arc::clone(&self.client);
            let tx = self.tx.clone();
            self.outstanding += 1;
            tokio::spawn(async move {
                let completion = perform(client.as_ref(), effect).await;
                let _ = tx.send(completion);
            });
        }
    }
}

async fn perform<C: ScoringClient>(client: &C, effect: Effect) -> Completion {
    match effect {
        Effect::OpenSession { run, player } => {
            log::debug!("Opening scoring session for {}", player);
            Completion::SessionOpened {
                run,
                result: client.open_session(player).await,
            }
        }
        Effect::SubmitScore {
            run,
            target,
            submission,
        } => Completion::ScoreSubmitted {
            run,
            target,
            result: client.submit_score(submission).await,
        },
        Effect::CloseSession { session_id } => {
            let result = client.close_session(session_id.clone()).await;
            Completion::SessionClosed { session_id, result }
        }
        Effect::FetchTotalScore { player } => Completion::TotalScore {
            result: client.player_total_score(player).await,
        },
    }
}
