//! Game tuning and preferences
//!
//! Loaded from a JSON file whose path comes from `TAPJAM_SETTINGS`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Environment variable naming the settings file
pub const SETTINGS_ENV: &str = "TAPJAM_SETTINGS";

/// Errors from loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// What drives the spawn cadence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClockMode {
    /// Spawn every `every` ticks, advance `speed` per tick
    Frames { every: u64 },
    /// Spawn every `interval_ms` of wall time, advance `speed * dt`
    Wall { interval_ms: f64 },
}

impl Default for ClockMode {
    fn default() -> Self {
        ClockMode::Wall {
            interval_ms: SPAWN_INTERVAL_MS,
        }
    }
}

/// Whether a due spawn is unconditional or gated on the active tile count.
///
/// The two give different difficulty curves and are never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SpawnPolicy {
    /// Every due spawn happens
    #[default]
    Periodic,
    /// A due spawn is skipped while `max_active` tiles are still falling
    Capped { max_active: usize },
}

/// Which falling tile a tap may legally consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRule {
    /// Only the falling tile with the globally lowest sequence
    #[default]
    Sequence,
    /// The lowest-sequence falling tile of any lane
    LaneFront,
}

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Field ===
    pub lanes: u8,
    pub field_height: f32,
    pub rows_on_screen: u32,

    // === Difficulty ===
    pub base_speed: f32,
    pub speed_increment: f32,
    pub level_threshold: u32,
    pub clock: ClockMode,
    pub spawn_policy: SpawnPolicy,
    pub order_rule: OrderRule,
    pub lane_retry_budget: u32,
    /// Frame deltas above this are clamped (wall clock only)
    pub max_frame_ms: f64,

    // === Scoring ===
    pub submit_debounce_ms: f64,
    /// Tries for the game-over flush before the delta is left unsubmitted
    pub final_flush_attempts: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lanes: LANES,
            field_height: FIELD_HEIGHT,
            rows_on_screen: ROWS_ON_SCREEN,

            base_speed: TILE_SPEED,
            speed_increment: SPEED_INCREMENT,
            level_threshold: LEVEL_THRESHOLD,
            clock: ClockMode::default(),
            spawn_policy: SpawnPolicy::default(),
            order_rule: OrderRule::default(),
            lane_retry_budget: LANE_RETRY_BUDGET,
            max_frame_ms: MAX_FRAME_MS,

            submit_debounce_ms: SUBMIT_DEBOUNCE_MS,
            final_flush_attempts: 3,
        }
    }
}

impl Settings {
    /// Frame-counted variant of the defaults
    pub fn frame_counted() -> Self {
        Self {
            clock: ClockMode::Frames {
                every: SPAWN_RATE_FRAMES,
            },
            ..Self::default()
        }
    }

    /// Vertical extent of one tile
    pub fn tile_height(&self) -> f32 {
        self.field_height / self.rows_on_screen as f32
    }

    /// Position past which a tile leaves the field
    pub fn retire_threshold(&self) -> f32 {
        self.field_height + self.tile_height()
    }

    /// Tile speed for a given level (level starts at 1)
    pub fn speed_for_level(&self, level: u32) -> f32 {
        self.base_speed + level.saturating_sub(1) as f32 * self.speed_increment
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field: &'static str, reason: &'static str| -> Result<(), SettingsError> {
            Err(SettingsError::Invalid { field, reason })
        };

        if self.lanes == 0 {
            return invalid("lanes", "must be at least 1");
        }
        if self.rows_on_screen == 0 {
            return invalid("rows_on_screen", "must be at least 1");
        }
        if self.field_height <= 0.0 {
            return invalid("field_height", "must be positive");
        }
        if self.base_speed <= 0.0 {
            return invalid("base_speed", "must be positive");
        }
        if self.speed_increment < 0.0 {
            return invalid("speed_increment", "must not be negative");
        }
        if self.level_threshold == 0 {
            return invalid("level_threshold", "must be at least 1");
        }
        match self.clock {
            ClockMode::Frames { every: 0 } => return invalid("clock.every", "must be at least 1"),
            ClockMode::Wall { interval_ms } if interval_ms <= 0.0 => {
                return invalid("clock.interval_ms", "must be positive");
            }
            _ => {}
        }
        if let SpawnPolicy::Capped { max_active: 0 } = self.spawn_policy {
            return invalid("spawn_policy.max_active", "must be at least 1");
        }
        if self.max_frame_ms <= 0.0 {
            return invalid("max_frame_ms", "must be positive");
        }
        if self.submit_debounce_ms < 0.0 {
            return invalid("submit_debounce_ms", "must not be negative");
        }
        Ok(())
    }

    /// Parse and validate settings from a JSON file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty JSON
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load settings from the file named by `TAPJAM_SETTINGS`, or defaults
    pub fn load() -> Self {
        let Ok(path) = std::env::var(SETTINGS_ENV) else {
            log::info!("Using default settings");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path);
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings file {}: {}", path, e);
                Self::default()
            }
        }
    }
}
