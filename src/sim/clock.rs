//! Spawn scheduler
//!
//! Two clocks drive the loop: a frame counter (spawn every N ticks) and a
//! wall clock (spawn when an interval has elapsed since the last spawn).
//! Both report how far tiles move this tick, in nominal frames.

use crate::consts::FRAME_MS;
use crate::settings::ClockMode;

/// Result of advancing the clock by one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockStep {
    /// Movement multiplier for this tick (1.0 = one nominal frame)
    pub dt: f32,
    pub spawn_due: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpawnClock {
    Frames {
        every: u64,
        frame: u64,
    },
    Wall {
        interval_ms: f64,
        max_frame_ms: f64,
        last_spawn_ms: f64,
        last_tick_ms: f64,
    },
}

impl SpawnClock {
    pub fn new(mode: ClockMode, max_frame_ms: f64) -> Self {
        match mode {
            ClockMode::Frames { every } => SpawnClock::Frames {
                every: every.max(1),
                frame: 0,
            },
            ClockMode::Wall { interval_ms } => SpawnClock::Wall {
                interval_ms,
                max_frame_ms,
                last_spawn_ms: 0.0,
                last_tick_ms: 0.0,
            },
        }
    }

    /// Rewind for a fresh run starting at `now_ms`
    pub fn start(&mut self, now_ms: f64) {
        match self {
            SpawnClock::Frames { frame, .. } => *frame = 0,
            SpawnClock::Wall {
                last_spawn_ms,
                last_tick_ms,
                ..
            } => {
                *last_spawn_ms = now_ms;
                *last_tick_ms = now_ms;
            }
        }
    }

    /// Rebase time references to the resume instant so the pause neither
    /// moves tiles nor triggers a burst of spawns.
    pub fn resume(&mut self, now_ms: f64) {
        if let SpawnClock::Wall {
            last_spawn_ms,
            last_tick_ms,
            ..
        } = self
        {
            *last_spawn_ms = now_ms;
            *last_tick_ms = now_ms;
        }
    }

    /// Advance one tick. At most one spawn is due per tick.
    pub fn advance(&mut self, now_ms: f64) -> ClockStep {
        match self {
            SpawnClock::Frames { every, frame } => {
                *frame += 1;
                ClockStep {
                    dt: 1.0,
                    spawn_due: *frame % *every == 0,
                }
            }
            SpawnClock::Wall {
                interval_ms,
                max_frame_ms,
                last_spawn_ms,
                last_tick_ms,
            } => {
                let elapsed = (now_ms - *last_tick_ms).clamp(0.0, *max_frame_ms);
                *last_tick_ms = now_ms.max(*last_tick_ms);

                let spawn_due = now_ms - *last_spawn_ms >= *interval_ms;
                if spawn_due {
                    *last_spawn_ms = now_ms;
                }
                ClockStep {
                    dt: (elapsed / FRAME_MS) as f32,
                    spawn_due,
                }
            }
        }
    }
}
