//! Serialized update path
//!
//! The engine owns the run: simulation state, score ledger and scoring
//! session. Commands and frames change it synchronously. Anything that needs
//! the scoring service is queued as an [`Effect`]; its result comes back
//! through [`Engine::apply`] as a [`Completion`], so collaborator latency never
//! reaches the frame loop.
//!
//! Every start and reset bumps a run counter. Completions tagged with an older
//! run only release that run's session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::{
    PlayerId, ScoreLedger, ScoreSubmission, ScoringError, SessionHandle, Sessions,
    TransactionReceipt,
};
use crate::settings::{Settings, SettingsError};
use crate::sim::{
    self, GameEvent, GamePhase, GameState, GameStats, PauseReason, Tap, TapOutcome, Tile,
};

/// A collaborator call the host should run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenSession { run: u64, player: PlayerId },
    SubmitScore {
        run: u64,
        /// Local score the service reaches if this lands
        target: u64,
        submission: ScoreSubmission,
    },
    CloseSession { session_id: String },
    FetchTotalScore { player: PlayerId },
}

/// Result of an [`Effect`], fed back through [`Engine::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    SessionOpened {
        run: u64,
        result: Result<SessionHandle, ScoringError>,
    },
    ScoreSubmitted {
        run: u64,
        target: u64,
        result: Result<TransactionReceipt, ScoringError>,
    },
    SessionClosed {
        session_id: String,
        result: Result<(), ScoringError>,
    },
    TotalScore {
        result: Result<u64, ScoringError>,
    },
}

/// Observable output for UI collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Game(GameEvent),
    SessionOpened { session_id: String },
    /// Session could not be opened; the run's score stays local
    SessionUnavailable,
    ScoreSubmitted { receipt: TransactionReceipt },
    /// Submission failed; `pending` rolls into the next one
    SubmissionFailed { pending: u64 },
    SessionClosed { session_id: String },
    TotalScore { total: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("cannot {command} while {phase:?}")]
    InvalidTransition {
        command: &'static str,
        phase: GamePhase,
    },
}

/// Everything a renderer or overlay needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub pause_reason: Option<PauseReason>,
    pub stats: GameStats,
    pub local_score: u64,
    pub submitted_score: u64,
    pub pending_score: u64,
    pub submitting: bool,
    pub session_active: bool,
    pub total_score: Option<u64>,
    pub tiles: Vec<Tile>,
}

#[derive(Debug)]
pub struct Engine {
    state: GameState,
    ledger: ScoreLedger,
    sessions: Sessions,
    player: Option<PlayerId>,
    run: u64,
    total_score: Option<u64>,
    effects: Vec<Effect>,
    events: Vec<Event>,
}

impl Engine {
    /// Idle engine. Without a player the game is local-only.
    pub fn new(
        player: Option<PlayerId>,
        settings: Settings,
        seed: u64,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let ledger = ScoreLedger::new(settings.submit_debounce_ms);
        Ok(Self {
            state: GameState::new(seed, settings),
            ledger,
            sessions: Sessions::new(),
            player,
            run: 0,
            total_score: None,
            effects: Vec::new(),
            events: Vec::new(),
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    pub fn player(&self) -> Option<&PlayerId> {
        self.player.as_ref()
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    /// Current run generation
    pub fn run(&self) -> u64 {
        self.run
    }

    /// Last lifetime total reported by the scoring service
    pub fn total_score(&self) -> Option<u64> {
        self.total_score
    }

    fn invalid(&self, command: &'static str) -> EngineError {
        EngineError::InvalidTransition {
            command,
            phase: self.state.phase,
        }
    }

    // === Commands ===

    /// Idle -> Playing. Opens a session without waiting for it.
    pub fn start(&mut self, now_ms: f64) -> Result<(), EngineError> {
        if !self.state.start(now_ms) {
            return Err(self.invalid("start"));
        }
        self.run += 1;
        self.ledger.reset();

        if let Some(player) = self.player.clone() {
            self.sessions.begin_open();
            self.effects.push(Effect::OpenSession {
                run: self.run,
                player: player.clone(),
            });
            self.effects.push(Effect::FetchTotalScore { player });
        }
        self.collect();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), EngineError> {
        if !self.state.pause(PauseReason::Manual) {
            return Err(self.invalid("pause"));
        }
        self.collect();
        Ok(())
    }

    pub fn resume(&mut self, now_ms: f64) -> Result<(), EngineError> {
        if !self.state.resume(now_ms) {
            return Err(self.invalid("resume"));
        }
        self.collect();
        Ok(())
    }

    pub fn toggle_pause(&mut self, now_ms: f64) -> Result<(), EngineError> {
        match self.state.phase {
            GamePhase::Playing => self.pause(),
            GamePhase::Paused => self.resume(now_ms),
            _ => Err(self.invalid("toggle pause")),
        }
    }

    /// Host surface visibility. Hiding pauses a playing run; showing resumes
    /// only a pause that hiding caused.
    pub fn set_visible(&mut self, visible: bool, now_ms: f64) {
        if !visible {
            self.state.pause(PauseReason::Hidden);
        } else if self.state.pause_reason == Some(PauseReason::Hidden) {
            self.state.resume(now_ms);
        }
        self.collect();
    }

    pub fn tap(&mut self, input: Tap, now_ms: f64) -> TapOutcome {
        let outcome = sim::tap(&mut self.state, input);
        if let TapOutcome::Hit(_) = outcome {
            self.ledger.record_point(now_ms);
        }
        self.collect();
        outcome
    }

    /// One frame: simulation tick, then the debounce timer
    pub fn frame(&mut self, now_ms: f64) {
        sim::tick(&mut self.state, now_ms);
        self.collect();
        if self.state.phase != GamePhase::GameOver && self.ledger.take_due(now_ms) {
            self.submit_pending();
        }
    }

    /// GameOver (or Idle) -> Idle. The open session is closed; one still
    /// waiting on the final submission is closed when that submission
    /// resolves. A run in progress must end first so its final delta is sent.
    pub fn reset(&mut self, seed: u64) -> Result<(), EngineError> {
        if self.state.phase.in_run() {
            return Err(self.invalid("reset"));
        }
        if self.ledger.is_submitting() {
            self.sessions.linger(self.run);
        }
        if let Some(session_id) = self.sessions.abandon() {
            log::info!("Closing scoring session {} on reset", session_id);
            self.effects.push(Effect::CloseSession { session_id });
        }
        self.run += 1;
        self.ledger.reset();
        self.state.reset(seed);
        self.collect();
        Ok(())
    }

    // === Collaborator results ===

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::SessionOpened { run, result } => self.session_opened(run, result),
            Completion::ScoreSubmitted {
                run,
                target,
                result,
            } => self.score_submitted(run, target, result),
            Completion::SessionClosed { session_id, result } => {
                self.sessions.closed(&session_id);
                match result {
                    Ok(()) => self.events.push(Event::SessionClosed { session_id }),
                    Err(e) => log::warn!("Closing session {} failed: {}", session_id, e),
                }
            }
            Completion::TotalScore { result } => match result {
                Ok(total) => {
                    self.total_score = Some(total);
                    self.events.push(Event::TotalScore { total });
                }
                Err(e) => log::warn!("Could not fetch total score: {}", e),
            },
        }
    }

    fn session_opened(&mut self, run: u64, result: Result<SessionHandle, ScoringError>) {
        if run != self.run || !self.sessions.is_opening() {
            if let Ok(handle) = result {
                if let Some(session_id) = self.sessions.mark_closing(handle.session_id) {
                    log::info!("Closing session {} opened for an ended run", session_id);
                    self.effects.push(Effect::CloseSession { session_id });
                }
            }
            return;
        }

        match result {
            Ok(handle) => {
                log::info!("Scoring session {} opened", handle.session_id);
                self.events.push(Event::SessionOpened {
                    session_id: handle.session_id.clone(),
                });
                self.sessions.opened(handle);
                // Points scored before the session existed whose timer already fired
                if self.ledger.is_final() || self.ledger.deadline().is_none() {
                    self.submit_pending();
                }
                self.close_if_settled();
            }
            Err(e) => {
                log::warn!("Could not open scoring session, score stays local: {}", e);
                self.sessions.open_failed();
                self.events.push(Event::SessionUnavailable);
            }
        }
    }

    fn score_submitted(
        &mut self,
        run: u64,
        target: u64,
        result: Result<TransactionReceipt, ScoringError>,
    ) {
        if run != self.run {
            if let Err(e) = &result {
                log::warn!("Submission for an ended run failed: {}", e);
            }
            if let Some(session_id) = self.sessions.release(run) {
                self.effects.push(Effect::CloseSession { session_id });
            }
            return;
        }

        match result {
            Ok(receipt) => {
                self.ledger.acknowledge(target);
                log::info!(
                    "Score {} credited ({}), submitted total {}",
                    receipt.score_amount,
                    receipt.transaction_hash,
                    self.ledger.submitted()
                );
                self.events.push(Event::ScoreSubmitted { receipt });
            }
            Err(e) => {
                self.ledger.reject();
                log::warn!(
                    "Score submission failed, {} stays pending: {}",
                    self.ledger.pending(),
                    e
                );
                self.events.push(Event::SubmissionFailed {
                    pending: self.ledger.pending(),
                });
            }
        }

        if self.ledger.is_final() {
            self.submit_pending();
            self.close_if_settled();
        }
    }

    // === Internals ===

    /// Move simulation events out, reacting to the end of a run
    fn collect(&mut self) {
        for event in self.state.drain_events() {
            let over = matches!(event, GameEvent::GameOver { .. });
            self.events.push(Event::Game(event));
            if over {
                self.finish_run();
            }
        }
    }

    fn finish_run(&mut self) {
        self.ledger
            .request_final(self.state.settings.final_flush_attempts);
        self.submit_pending();
        self.close_if_settled();
    }

    fn submit_pending(&mut self) {
        let (Some(player), Some(handle)) = (self.player.as_ref(), self.sessions.handle()) else {
            return;
        };
        if let Some(batch) = self.ledger.begin() {
            log::debug!(
                "Submitting {} (local {}, submitted {})",
                batch.delta,
                self.ledger.local(),
                self.ledger.submitted()
            );
            self.effects.push(Effect::SubmitScore {
                run: self.run,
                target: batch.target,
                submission: ScoreSubmission {
                    player: player.clone(),
                    session_id: handle.session_id.clone(),
                    score_amount: batch.delta,
                },
            });
        }
    }

    /// After game over, close the session once the final flush is done
    fn close_if_settled(&mut self) {
        if self.state.phase != GamePhase::GameOver || !self.ledger.is_settled() {
            return;
        }
        if let Some(session_id) = self.sessions.close() {
            log::info!("Closing scoring session {}", session_id);
            self.effects.push(Effect::CloseSession { session_id });
            if let Some(player) = self.player.clone() {
                self.effects.push(Effect::FetchTotalScore { player });
            }
        }
    }

    // === Outputs ===

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.state.phase,
            pause_reason: self.state.pause_reason,
            stats: self.state.stats(),
            local_score: self.ledger.local(),
            submitted_score: self.ledger.submitted(),
            pending_score: self.ledger.pending(),
            submitting: self.ledger.is_submitting(),
            session_active: self.sessions.handle().is_some(),
            total_score: self.total_score,
            tiles: self.state.tiles.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ClockMode;
    use crate::sim::Fault;

    fn quiet_settings() -> Settings {
        Settings {
            clock: ClockMode::Frames { every: 1_000_000 },
            ..Settings::default()
        }
    }

    fn engine() -> Engine {
        Engine::new(Some(PlayerId::new("0xplayer")), quiet_settings(), 7).unwrap()
    }

    fn hit(engine: &mut Engine, now_ms: f64) {
        let id = engine.state.spawn_tile(None).id;
        assert_eq!(engine.tap(Tap::Tile(id), now_ms), TapOutcome::Hit(id));
    }

    fn fail(engine: &mut Engine, now_ms: f64) {
        engine.tap(Tap::Lane { lane: 0, y: -5000.0 }, now_ms);
        assert_eq!(engine.phase(), GamePhase::GameOver);
    }

    /// Start and complete the session open; returns the session id
    fn start_open(engine: &mut Engine, now_ms: f64) -> String {
        engine.start(now_ms).unwrap();
        let run = engine.run();
        let id = format!("s{}", run);
        engine.take_effects();
        engine.apply(Completion::SessionOpened {
            run,
            result: Ok(SessionHandle {
                session_id: id.clone(),
                session_token: "t".into(),
            }),
        });
        id
    }

    fn submissions(effects: &[Effect]) -> Vec<(u64, u64)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::SubmitScore {
                    target, submission, ..
                } => Some((*target, submission.score_amount)),
                _ => None,
            })
            .collect()
    }

    fn closes(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::CloseSession { session_id } => Some(session_id.clone()),
                _ => None,
            })
            .collect()
    }

    fn receipt(amount: u64) -> Result<TransactionReceipt, ScoringError> {
        Ok(TransactionReceipt {
            transaction_hash: "0x1".into(),
            score_amount: amount,
        })
    }

    #[test]
    fn test_start_opens_session_and_fetches_total() {
        let mut engine = engine();
        engine.start(0.0).unwrap();
        let effects = engine.take_effects();
        assert_eq!(
            effects,
            vec![
                Effect::OpenSession {
                    run: 1,
                    player: PlayerId::new("0xplayer")
                },
                Effect::FetchTotalScore {
                    player: PlayerId::new("0xplayer")
                },
            ]
        );
        assert_eq!(engine.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_local_only_without_player() {
        let mut engine = Engine::new(None, quiet_settings(), 1).unwrap();
        engine.start(0.0).unwrap();
        hit(&mut engine, 10.0);
        engine.frame(5000.0);
        assert!(engine.take_effects().is_empty());
        assert_eq!(engine.snapshot().local_score, 1);
    }

    #[test]
    fn test_invalid_commands() {
        let mut engine = engine();
        assert!(engine.pause().is_err());
        assert!(engine.resume(0.0).is_err());
        assert!(engine.toggle_pause(0.0).is_err());
        engine.start(0.0).unwrap();
        assert_eq!(
            engine.start(0.0),
            Err(EngineError::InvalidTransition {
                command: "start",
                phase: GamePhase::Playing
            })
        );
        engine.toggle_pause(0.0).unwrap();
        assert_eq!(engine.phase(), GamePhase::Paused);
        engine.toggle_pause(10.0).unwrap();
        assert_eq!(engine.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_debounce_coalesces_taps() {
        let mut engine = engine();
        start_open(&mut engine, 0.0);
        for i in 0..5 {
            hit(&mut engine, 100.0 * i as f64);
            engine.frame(100.0 * i as f64 + 50.0);
        }
        assert!(engine.take_effects().is_empty());

        // Quiet period after the last tap at 400
        engine.frame(2399.0);
        assert!(engine.take_effects().is_empty());
        engine.frame(2400.0);
        assert_eq!(submissions(&engine.take_effects()), vec![(5, 5)]);
        engine.frame(9000.0);
        assert!(engine.take_effects().is_empty());
    }

    #[test]
    fn test_acknowledge_keeps_in_flight_points_pending() {
        let mut engine = engine();
        start_open(&mut engine, 0.0);
        hit(&mut engine, 0.0);
        hit(&mut engine, 0.0);
        engine.frame(2000.0);
        assert_eq!(submissions(&engine.take_effects()), vec![(2, 2)]);

        hit(&mut engine, 2100.0);
        engine.apply(Completion::ScoreSubmitted {
            run: engine.run(),
            target: 2,
            result: receipt(2),
        });
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.submitted_score, 2);
        assert_eq!(snapshot.pending_score, 1);

        engine.frame(4100.0);
        assert_eq!(submissions(&engine.take_effects()), vec![(3, 1)]);
    }

    #[test]
    fn test_failed_submission_retried_by_accumulation() {
        let mut engine = engine();
        start_open(&mut engine, 0.0);
        hit(&mut engine, 0.0);
        engine.frame(2000.0);
        assert_eq!(submissions(&engine.take_effects()), vec![(1, 1)]);
        engine.apply(Completion::ScoreSubmitted {
            run: engine.run(),
            target: 1,
            result: Err(ScoringError::Transport("down".into())),
        });
        assert_eq!(engine.snapshot().submitted_score, 0);
        assert!(
            engine
                .drain_events()
                .contains(&Event::SubmissionFailed { pending: 1 })
        );

        hit(&mut engine, 3000.0);
        engine.frame(5000.0);
        assert_eq!(submissions(&engine.take_effects()), vec![(2, 2)]);
    }

    #[test]
    fn test_game_over_flushes_then_closes() {
        let mut engine = engine();
        let session = start_open(&mut engine, 0.0);
        hit(&mut engine, 0.0);
        hit(&mut engine, 10.0);
        hit(&mut engine, 20.0);
        fail(&mut engine, 30.0);

        let effects = engine.take_effects();
        assert_eq!(submissions(&effects), vec![(3, 3)]);
        assert!(closes(&effects).is_empty());
        assert_eq!(engine.ledger().deadline(), None);

        engine.apply(Completion::ScoreSubmitted {
            run: engine.run(),
            target: 3,
            result: receipt(3),
        });
        let effects = engine.take_effects();
        assert_eq!(closes(&effects), vec![session.clone()]);
        assert!(effects.contains(&Effect::FetchTotalScore {
            player: PlayerId::new("0xplayer")
        }));
        assert_eq!(engine.snapshot().submitted_score, 3);

        engine.reset(8).unwrap();
        assert!(closes(&engine.take_effects()).is_empty());
    }

    #[test]
    fn test_final_flush_chains_behind_in_flight_submission() {
        let mut engine = engine();
        start_open(&mut engine, 0.0);
        hit(&mut engine, 0.0);
        engine.frame(2000.0);
        assert_eq!(submissions(&engine.take_effects()), vec![(1, 1)]);

        hit(&mut engine, 2100.0);
        fail(&mut engine, 2200.0);
        assert!(engine.take_effects().is_empty());

        engine.apply(Completion::ScoreSubmitted {
            run: engine.run(),
            target: 1,
            result: receipt(1),
        });
        assert_eq!(submissions(&engine.take_effects()), vec![(2, 1)]);
    }

    #[test]
    fn test_final_flush_retries_are_bounded() {
        let mut engine = engine();
        let session = start_open(&mut engine, 0.0);
        hit(&mut engine, 0.0);
        fail(&mut engine, 10.0);

        let attempts = engine.state().settings.final_flush_attempts;
        let mut sent = submissions(&engine.take_effects()).len();
        let mut effects = Vec::new();
        for _ in 0..attempts {
            engine.apply(Completion::ScoreSubmitted {
                run: engine.run(),
                target: 1,
                result: Err(ScoringError::Transport("down".into())),
            });
            effects = engine.take_effects();
            sent += submissions(&effects).len();
        }
        assert_eq!(sent as u32, attempts);
        assert_eq!(closes(&effects), vec![session]);
        assert_eq!(engine.snapshot().pending_score, 1);
    }

    #[test]
    fn test_open_failure_keeps_playing_locally() {
        let mut engine = engine();
        engine.start(0.0).unwrap();
        engine.take_effects();
        engine.apply(Completion::SessionOpened {
            run: 1,
            result: Err(ScoringError::Transport("down".into())),
        });
        assert!(engine.drain_events().contains(&Event::SessionUnavailable));

        hit(&mut engine, 0.0);
        engine.frame(2000.0);
        assert_eq!(engine.phase(), GamePhase::Playing);
        fail(&mut engine, 2100.0);
        assert!(engine.take_effects().is_empty());
        assert_eq!(engine.snapshot().local_score, 1);
        assert_eq!(engine.snapshot().submitted_score, 0);
    }

    #[test]
    fn test_late_session_flushes_deferred_points() {
        let mut engine = engine();
        engine.start(0.0).unwrap();
        engine.take_effects();
        hit(&mut engine, 0.0);
        engine.frame(2000.0);
        assert!(engine.take_effects().is_empty());

        engine.apply(Completion::SessionOpened {
            run: 1,
            result: Ok(SessionHandle {
                session_id: "late".into(),
                session_token: "t".into(),
            }),
        });
        assert_eq!(submissions(&engine.take_effects()), vec![(1, 1)]);
    }

    #[test]
    fn test_session_opened_after_reset_is_closed() {
        let mut engine = engine();
        engine.start(0.0).unwrap();
        engine.take_effects();
        fail(&mut engine, 10.0);
        engine.reset(2).unwrap();
        assert!(engine.take_effects().is_empty());

        engine.apply(Completion::SessionOpened {
            run: 1,
            result: Ok(SessionHandle {
                session_id: "stale".into(),
                session_token: "t".into(),
            }),
        });
        assert_eq!(closes(&engine.take_effects()), vec!["stale".to_string()]);
        assert!(!engine.snapshot().session_active);
    }

    #[test]
    fn test_session_closed_once_across_resets() {
        let mut engine = engine();
        let session = start_open(&mut engine, 0.0);
        fail(&mut engine, 10.0);
        assert_eq!(closes(&engine.take_effects()), vec![session.clone()]);
        engine.reset(2).unwrap();
        engine.reset(3).unwrap();
        assert!(engine.take_effects().is_empty());
        engine.apply(Completion::SessionClosed {
            session_id: session.clone(),
            result: Err(ScoringError::Transport("timeout".into())),
        });
        assert!(engine.take_effects().is_empty());
        assert!(!engine.sessions().is_closing(&session));
    }

    #[test]
    fn test_reset_with_submission_in_flight_defers_close() {
        let mut engine = engine();
        let session = start_open(&mut engine, 0.0);
        hit(&mut engine, 0.0);
        fail(&mut engine, 10.0);
        assert_eq!(submissions(&engine.take_effects()), vec![(1, 1)]);
        let old_run = engine.run();

        engine.reset(2).unwrap();
        assert!(engine.take_effects().is_empty());
        assert_eq!(engine.snapshot().local_score, 0);

        engine.apply(Completion::ScoreSubmitted {
            run: old_run,
            target: 1,
            result: receipt(1),
        });
        assert_eq!(closes(&engine.take_effects()), vec![session]);
        assert_eq!(engine.snapshot().submitted_score, 0);
    }

    #[test]
    fn test_reset_refused_while_run_in_progress() {
        let mut engine = engine();
        let session = start_open(&mut engine, 0.0);
        for i in 0..3 {
            hit(&mut engine, i as f64);
        }

        assert_eq!(
            engine.reset(9),
            Err(EngineError::InvalidTransition {
                command: "reset",
                phase: GamePhase::Playing
            })
        );
        engine.pause().unwrap();
        assert!(engine.reset(9).is_err());
        assert!(engine.take_effects().is_empty());
        assert_eq!(engine.snapshot().pending_score, 3);
        assert!(engine.snapshot().session_active);

        // Ending the run flushes the three points before anything closes
        engine.resume(10.0).unwrap();
        fail(&mut engine, 20.0);
        assert_eq!(submissions(&engine.take_effects()), vec![(3, 3)]);
        engine.apply(Completion::ScoreSubmitted {
            run: engine.run(),
            target: 3,
            result: receipt(3),
        });
        assert_eq!(closes(&engine.take_effects()), vec![session]);
        engine.reset(9).unwrap();
        assert_eq!(engine.phase(), GamePhase::Idle);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = Settings {
            level_threshold: 0,
            ..quiet_settings()
        };
        assert!(matches!(
            Engine::new(None, settings, 1),
            Err(SettingsError::Invalid {
                field: "level_threshold",
                ..
            })
        ));
        let settings = Settings {
            rows_on_screen: 0,
            ..quiet_settings()
        };
        assert!(Engine::new(None, settings, 1).is_err());
    }

    #[test]
    fn test_visibility_pauses_and_resumes() {
        let mut engine = engine();
        engine.start(0.0).unwrap();
        engine.set_visible(false, 10.0);
        assert_eq!(engine.snapshot().pause_reason, Some(PauseReason::Hidden));
        engine.set_visible(true, 20.0);
        assert_eq!(engine.phase(), GamePhase::Playing);

        engine.pause().unwrap();
        engine.set_visible(false, 30.0);
        engine.set_visible(true, 40.0);
        assert_eq!(engine.phase(), GamePhase::Paused);
        assert_eq!(engine.snapshot().pause_reason, Some(PauseReason::Manual));
    }

    #[test]
    fn test_local_score_tracks_game_score() {
        let mut engine = engine();
        start_open(&mut engine, 0.0);
        for i in 0..12 {
            hit(&mut engine, i as f64);
        }
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.local_score, snapshot.stats.score);
        assert_eq!(snapshot.stats.level, 2);
        let events = engine.drain_events();
        assert!(events.contains(&Event::Game(GameEvent::LevelUp { level: 2 })));
    }

    #[test]
    fn test_wrong_order_reported_in_game_over() {
        let mut engine = engine();
        start_open(&mut engine, 0.0);
        let first = engine.state.spawn_tile(Some(0)).id;
        let second = engine.state.spawn_tile(Some(1)).id;
        let outcome = engine.tap(Tap::Tile(second), 0.0);
        let fault = Fault::WrongOrder {
            tapped: second,
            expected: first,
        };
        assert_eq!(outcome, TapOutcome::Fault(fault));
        assert!(
            engine
                .drain_events()
                .contains(&Event::Game(GameEvent::GameOver { fault }))
        );
    }

    #[test]
    fn test_total_score_exposed() {
        let mut engine = engine();
        engine.apply(Completion::TotalScore { result: Ok(42) });
        assert_eq!(engine.snapshot().total_score, Some(42));
    }
}
