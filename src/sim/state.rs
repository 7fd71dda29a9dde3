//! Game state and core simulation types
//!
//! Everything a run mutates lives in `GameState`; the scheduler, tile set and
//! validator all operate on it through `tick` and `tap`.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::clock::SpawnClock;
use super::tiles::TileSet;
use crate::settings::Settings;

/// Tile identifier, unique within a run
pub type TileId = u32;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// No run yet, or reset after game over
    Idle,
    /// Active gameplay
    Playing,
    /// Scheduler suspended; no tile changes
    Paused,
    /// Run ended
    GameOver,
}

impl GamePhase {
    /// Playing or paused: a run is in progress
    pub fn in_run(self) -> bool {
        matches!(self, GamePhase::Playing | GamePhase::Paused)
    }
}

/// Why a run is paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauseReason {
    /// Explicit pause command
    Manual,
    /// Host surface lost focus or visibility
    Hidden,
}

/// Tile lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileState {
    Falling,
    Hit,
    Expired,
}

/// One falling unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub lane: u8,
    /// Distance travelled from spawn; negative while entering the field
    pub position: f32,
    /// Increment per nominal frame
    pub speed: f32,
    /// Global tap order
    pub sequence: u64,
    pub state: TileState,
}

impl Tile {
    pub fn is_falling(&self) -> bool {
        self.state == TileState::Falling
    }

    /// Whether `y` lies within this tile's vertical extent
    pub fn covers(&self, y: f32, tile_height: f32) -> bool {
        y >= self.position && y <= self.position + tile_height
    }
}

/// Player-caused run failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fault {
    /// A falling tile was tapped out of order
    WrongOrder { tapped: TileId, expected: TileId },
    /// A lane was tapped where no falling tile was
    EmptyTap { lane: u8 },
    /// A tile left the field without being hit
    MissedTile { tile: TileId },
}

/// Discrete simulation events, drained by the host each frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Started,
    TileSpawned { id: TileId, lane: u8 },
    TileHit { id: TileId },
    LevelUp { level: u32 },
    Paused { reason: PauseReason },
    Resumed,
    GameOver { fault: Fault },
    Reset,
}

/// Derived run statistics for overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub score: u64,
    pub level: u32,
    pub accuracy: u32,
    pub tiles_hit: u64,
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct GameState {
    pub settings: Settings,
    /// Seed of the current run's lane RNG
    pub seed: u64,
    pub rng: Pcg32,
    pub phase: GamePhase,
    pub pause_reason: Option<PauseReason>,
    pub score: u64,
    pub level: u32,
    pub tiles_hit: u64,
    /// Simulation ticks in the current run
    pub time_ticks: u64,
    pub tiles: TileSet,
    pub clock: SpawnClock,
    /// Set when the run ends
    pub fault: Option<Fault>,
    events: Vec<GameEvent>,
}

impl GameState {
    /// Create an idle game with the given lane seed
    pub fn new(seed: u64, settings: Settings) -> Self {
        let clock = SpawnClock::new(settings.clock, settings.max_frame_ms);
        Self {
            settings,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Idle,
            pause_reason: None,
            score: 0,
            level: 1,
            tiles_hit: 0,
            time_ticks: 0,
            tiles: TileSet::new(),
            clock,
            fault: None,
            events: Vec::new(),
        }
    }

    fn clear_run(&mut self) {
        self.score = 0;
        self.level = 1;
        self.tiles_hit = 0;
        self.time_ticks = 0;
        self.tiles = TileSet::new();
        self.pause_reason = None;
        self.fault = None;
    }

    /// Idle -> Playing. Returns false if the phase does not allow it.
    pub fn start(&mut self, now_ms: f64) -> bool {
        if self.phase != GamePhase::Idle {
            return false;
        }
        self.clear_run();
        self.clock.start(now_ms);
        self.phase = GamePhase::Playing;
        self.events.push(GameEvent::Started);
        log::info!("Run started (seed {})", self.seed);
        true
    }

    /// Playing -> Paused
    pub fn pause(&mut self, reason: PauseReason) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        self.phase = GamePhase::Paused;
        self.pause_reason = Some(reason);
        self.events.push(GameEvent::Paused { reason });
        log::info!("Paused ({:?}) at score {}", reason, self.score);
        true
    }

    /// Paused -> Playing. The clock is rebased so paused time never counts.
    pub fn resume(&mut self, now_ms: f64) -> bool {
        if self.phase != GamePhase::Paused {
            return false;
        }
        self.clock.resume(now_ms);
        self.phase = GamePhase::Playing;
        self.pause_reason = None;
        self.events.push(GameEvent::Resumed);
        log::info!("Resumed");
        true
    }

    /// Any phase -> Idle, reseeding the lane RNG for the next run
    pub fn reset(&mut self, seed: u64) {
        self.clear_run();
        self.seed = seed;
        self.rng = Pcg32::seed_from_u64(seed);
        self.phase = GamePhase::Idle;
        self.events.push(GameEvent::Reset);
    }

    /// Playing -> GameOver
    pub fn fail(&mut self, fault: Fault) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.fault = Some(fault);
        self.events.push(GameEvent::GameOver { fault });
        log::info!(
            "Game over: {:?} (score {}, level {})",
            fault,
            self.score,
            self.level
        );
    }

    /// Apply one correct tap: +1 score, level from the hit count
    pub fn record_hit(&mut self, id: TileId) {
        self.score += 1;
        self.tiles_hit += 1;
        self.events.push(GameEvent::TileHit { id });

        let level = (self.tiles_hit / self.settings.level_threshold as u64) as u32 + 1;
        if level > self.level {
            self.level = level;
            self.events.push(GameEvent::LevelUp { level });
            log::info!("Level up: {}", level);
        }
    }

    /// Tile speed for the current level
    pub fn current_speed(&self) -> f32 {
        self.settings.speed_for_level(self.level)
    }

    /// Spawn a tile in `lane`, or in a random lane under the anti-repetition rule
    pub fn spawn_tile(&mut self, lane: Option<u8>) -> Tile {
        let lane = match lane {
            Some(lane) => lane,
            None => self.tiles.pick_lane(
                &mut self.rng,
                self.settings.lanes,
                self.settings.lane_retry_budget,
            ),
        };
        let speed = self.current_speed();
        let entry = -self.settings.tile_height();
        let tile = self.tiles.spawn(lane, entry, speed).clone();
        self.events.push(GameEvent::TileSpawned { id: tile.id, lane });
        log::debug!("Spawned tile {} in lane {} at speed {}", tile.id, lane, speed);
        tile
    }

    /// `round(score / tiles_hit * 100)`, 100 before the first hit
    pub fn accuracy(&self) -> u32 {
        if self.tiles_hit == 0 {
            100
        } else {
            (self.score as f64 / self.tiles_hit as f64 * 100.0).round() as u32
        }
    }

    pub fn stats(&self) -> GameStats {
        GameStats {
            score: self.score,
            level: self.level,
            accuracy: self.accuracy(),
            tiles_hit: self.tiles_hit,
        }
    }

    /// Take all events raised since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
