//! Tap Jam - A lane-based reflex tile-tapping game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (tiles, spawning, tap validation, phases)
//! - `scoring`: Score reconciliation and the scoring collaborator contract
//! - `engine`: Serialized update path tying the simulation to scoring
//! - `runtime`: Async driver that runs collaborator calls off the frame loop
//! - `settings`: Data-driven game tuning

pub mod engine;
pub mod runtime;
pub mod scoring;
pub mod settings;
pub mod sim;

pub use engine::{Effect, Engine, EngineError, GameSnapshot};
pub use runtime::Runtime;
pub use scoring::{LocalScoringClient, PlayerId, ScoringClient, ScoringError};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Number of lanes tiles fall through
    pub const LANES: u8 = 4;
    /// Field height divided by this gives the tile extent
    pub const ROWS_ON_SCREEN: u32 = 6;
    /// Default playfield height in pixels
    pub const FIELD_HEIGHT: f32 = 720.0;

    /// Tile speed at level 1 (pixels per nominal frame)
    pub const TILE_SPEED: f32 = 4.0;
    /// Extra speed per level above 1
    pub const SPEED_INCREMENT: f32 = 0.5;

    /// Frames between spawns in the frame-counted clock (1 tile/s at 60 fps)
    pub const SPAWN_RATE_FRAMES: u64 = 60;
    /// Milliseconds between spawns in the wall-clock scheduler
    pub const SPAWN_INTERVAL_MS: f64 = 1000.0;

    /// Correct taps needed per level
    pub const LEVEL_THRESHOLD: u32 = 10;

    /// Quiet period before a batched score submission
    pub const SUBMIT_DEBOUNCE_MS: f64 = 2000.0;

    /// Nominal frame duration (60 Hz)
    pub const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Longest frame delta fed to the simulation (prevents tunnelling after a hitch)
    pub const MAX_FRAME_MS: f64 = 100.0;

    /// Lane redraws before the anti-repetition rule gives up
    pub const LANE_RETRY_BUDGET: u32 = 16;
}
