//! Per-tick simulation step and tap application
//!
//! Within one tick the order is fixed: spawn, advance, retire. A fresh tile
//! is therefore never retired in the tick that created it, and the fail check
//! always sees fully advanced positions.

use super::input::{Tap, TapOutcome, classify_lane_tap, classify_tile_tap};
use super::state::{Fault, GamePhase, GameState};
use crate::settings::SpawnPolicy;

/// Advance the game by one tick at `now_ms`. No-op unless playing.
pub fn tick(state: &mut GameState, now_ms: f64) {
    if state.phase != GamePhase::Playing {
        return;
    }

    state.time_ticks += 1;
    let step = state.clock.advance(now_ms);

    // Spawn
    if step.spawn_due {
        let allowed = match state.settings.spawn_policy {
            SpawnPolicy::Periodic => true,
            SpawnPolicy::Capped { max_active } => state.tiles.falling_count() < max_active,
        };
        if allowed {
            state.spawn_tile(None);
        }
    }

    // Advance
    state.tiles.advance(step.dt);

    // Retire; an unhit tile leaving the field ends the run in this same step
    let retired = state.tiles.retire(state.settings.retire_threshold());
    if let Some(missed) = retired.missed.first() {
        state.fail(Fault::MissedTile { tile: missed.id });
    }
}

/// Apply a player tap. Taps outside `Playing` are ignored.
pub fn tap(state: &mut GameState, input: Tap) -> TapOutcome {
    if state.phase != GamePhase::Playing {
        return TapOutcome::Ignored;
    }

    let rule = state.settings.order_rule;
    let outcome = match input {
        Tap::Tile(id) => classify_tile_tap(&state.tiles, id, rule),
        Tap::Lane { lane, y } => classify_lane_tap(
            &state.tiles,
            lane,
            y,
            state.settings.lanes,
            state.settings.tile_height(),
            rule,
        ),
    };

    match outcome {
        TapOutcome::Hit(id) => {
            state.tiles.mark_hit(id);
            state.record_hit(id);
            log::debug!("Hit tile {} (score {})", id, state.score);
        }
        TapOutcome::Fault(fault) => state.fail(fault),
        TapOutcome::Ignored => log::trace!("Ignored stale tap {:?}", input),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FRAME_MS;
    use crate::settings::{ClockMode, Settings};
    use crate::sim::state::{GameEvent, PauseReason, TileState};

    fn frame_game(every: u64) -> GameState {
        let settings = Settings {
            clock: ClockMode::Frames { every },
            ..Settings::default()
        };
        let mut state = GameState::new(12345, settings);
        state.start(0.0);
        state
    }

    #[test]
    fn test_tick_spawns_on_schedule() {
        let mut state = frame_game(60);
        for _ in 0..59 {
            tick(&mut state, 0.0);
        }
        assert!(state.tiles.is_empty());
        tick(&mut state, 0.0);
        assert_eq!(state.tiles.len(), 1);
    }

    #[test]
    fn test_fresh_tile_advanced_in_spawn_tick() {
        let mut state = frame_game(1);
        tick(&mut state, 0.0);
        let tile = state.tiles.iter().next().cloned().unwrap();
        assert_eq!(tile.position, -state.settings.tile_height() + tile.speed);
    }

    #[test]
    fn test_missed_tile_ends_run_same_tick() {
        let mut state = frame_game(10_000);
        let tile = state.spawn_tile(Some(0));
        let threshold = state.settings.retire_threshold();
        let ticks = ((threshold - tile.position) / tile.speed).floor() as u32 + 1;
        for _ in 0..ticks - 1 {
            tick(&mut state, 0.0);
        }
        assert_eq!(state.phase, GamePhase::Playing);
        tick(&mut state, 0.0);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.tiles.is_empty());
        assert_eq!(state.fault, Some(Fault::MissedTile { tile: tile.id }));
    }

    #[test]
    fn test_hit_tile_leaves_silently() {
        let mut state = frame_game(10_000);
        let tile = state.spawn_tile(Some(0));
        assert_eq!(tap(&mut state, Tap::Tile(tile.id)), TapOutcome::Hit(tile.id));
        for _ in 0..1_000 {
            tick(&mut state, 0.0);
        }
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.tiles.is_empty());
    }

    #[test]
    fn test_wrong_order_ends_run() {
        let mut state = frame_game(10_000);
        let first = state.spawn_tile(Some(0));
        let second = state.spawn_tile(Some(1));
        let outcome = tap(&mut state, Tap::Tile(second.id));
        assert_eq!(
            outcome,
            TapOutcome::Fault(Fault::WrongOrder {
                tapped: second.id,
                expected: first.id
            })
        );
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_in_order_taps_score() {
        let mut state = frame_game(10_000);
        let ids: Vec<_> = (0..4).map(|lane| state.spawn_tile(Some(lane)).id).collect();
        for id in &ids {
            assert_eq!(tap(&mut state, Tap::Tile(*id)), TapOutcome::Hit(*id));
        }
        assert_eq!(state.score, 4);
        assert_eq!(state.tiles_hit, 4);
        assert!(state.tiles.iter().all(|t| t.state == TileState::Hit));
        // Duplicate tap on a consumed tile is stale, not a fault
        assert_eq!(tap(&mut state, Tap::Tile(ids[0])), TapOutcome::Ignored);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_empty_lane_tap_ends_run() {
        let mut state = frame_game(10_000);
        state.spawn_tile(Some(0));
        let outcome = tap(&mut state, Tap::Lane { lane: 3, y: 400.0 });
        assert_eq!(outcome, TapOutcome::Fault(Fault::EmptyTap { lane: 3 }));
        assert_eq!(state.phase, GamePhase::GameOver);
    }

    #[test]
    fn test_paused_state_frozen() {
        let mut state = GameState::new(5, Settings::default());
        state.start(0.0);
        tick(&mut state, FRAME_MS);
        tick(&mut state, 1_000.0);
        let before: Vec<_> = state.tiles.iter().cloned().collect();
        assert!(!before.is_empty());

        state.pause(PauseReason::Manual);
        tick(&mut state, 50_000.0);
        assert_eq!(tap(&mut state, Tap::Lane { lane: 0, y: 0.0 }), TapOutcome::Ignored);
        state.resume(90_000.0);
        tick(&mut state, 90_000.0);

        let after: Vec<_> = state.tiles.iter().cloned().collect();
        assert_eq!(before, after);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_level_up_event_from_taps() {
        let mut state = frame_game(10_000);
        for lane in 0..10u8 {
            let id = state.spawn_tile(Some(lane % 4)).id;
            tap(&mut state, Tap::Tile(id));
        }
        assert_eq!(state.level, 2);
        assert!(state
            .drain_events()
            .contains(&GameEvent::LevelUp { level: 2 }));
    }

    #[test]
    fn test_capped_policy_limits_active_tiles() {
        let settings = Settings {
            clock: ClockMode::Frames { every: 1 },
            spawn_policy: SpawnPolicy::Capped { max_active: 3 },
            ..Settings::default()
        };
        let mut state = GameState::new(3, settings);
        state.start(0.0);
        for _ in 0..10 {
            tick(&mut state, 0.0);
        }
        assert_eq!(state.tiles.falling_count(), 3);
    }

    #[test]
    fn test_determinism() {
        let mut a = GameState::new(99999, Settings::frame_counted());
        let mut b = GameState::new(99999, Settings::frame_counted());
        a.start(0.0);
        b.start(0.0);
        for _ in 0..600 {
            tick(&mut a, 0.0);
            tick(&mut b, 0.0);
        }
        let lanes_a: Vec<_> = a.tiles.iter().map(|t| t.lane).collect();
        let lanes_b: Vec<_> = b.tiles.iter().map(|t| t.lane).collect();
        assert_eq!(lanes_a, lanes_b);
    }
}
