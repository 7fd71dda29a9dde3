//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only enters through the `now_ms` passed to `tick`
//! - Seeded RNG only
//! - Stable iteration order (by tile id)
//! - No scoring, network or platform dependencies

pub mod clock;
pub mod input;
pub mod state;
pub mod tick;
pub mod tiles;

pub use clock::{ClockStep, SpawnClock};
pub use input::{Tap, TapOutcome, classify_lane_tap, classify_tile_tap, tile_at};
pub use state::{
    Fault, GameEvent, GamePhase, GameState, GameStats, PauseReason, Tile, TileId, TileState,
};
pub use tick::{tap, tick};
pub use tiles::{Retired, TileSet};
