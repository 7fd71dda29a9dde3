//! Tap Jam headless demo
//!
//! Plays one run against the in-memory scoring service with an autopilot at
//! the controls, then prints the final snapshot as JSON.
//!
//! Environment:
//! - `TAPJAM_SETTINGS`: path to a settings JSON file
//! - `TAPJAM_SEED`: lane seed (defaults to the clock)
//! - `TAPJAM_DEMO_SECS`: how long the autopilot keeps tapping (default 30)
//! - `TAPJAM_PLAYER`: player id to score against

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tokio::time::Instant;

use tap_jam::engine::Event;
use tap_jam::sim::{GameEvent, GamePhase, GameState, Tap};
use tap_jam::{Engine, LocalScoringClient, PlayerId, Runtime, Settings};

/// Plays like a decent human: waits for the required tile to drop into the
/// lower part of the field, then taps it, sometimes by lane.
struct Autopilot {
    rng: Pcg32,
    /// Fraction of the field the next tile must reach before it is tapped
    reach: f32,
}

impl Autopilot {
    fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed ^ 0x5eed),
            reach: 0.5,
        }
    }

    fn choose(&mut self, state: &GameState) -> Option<Tap> {
        let tile = state.tiles.next_in_order()?;
        if tile.position < state.settings.field_height * self.reach {
            return None;
        }
        self.reach = self.rng.random_range(0.3..0.8);

        if self.rng.random_bool(0.5) {
            Some(Tap::Lane {
                lane: tile.lane,
                y: tile.position + state.settings.tile_height() / 2.0,
            })
        } else {
            Some(Tap::Tile(tile.id))
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn report(event: &Event) {
    match event {
        Event::Game(GameEvent::TileSpawned { .. } | GameEvent::TileHit { .. }) => {
            log::trace!("{:?}", event)
        }
        Event::Game(GameEvent::LevelUp { level }) => log::info!("Level {}!", level),
        Event::ScoreSubmitted { receipt } => log::info!(
            "Submitted +{} (tx {})",
            receipt.score_amount,
            receipt.transaction_hash
        ),
        Event::TotalScore { total } => log::info!("Lifetime total: {}", total),
        other => log::debug!("{:?}", other),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Tap Jam (headless) starting...");

    let settings = Settings::load();
    let clock_seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let seed = env_or("TAPJAM_SEED", clock_seed);
    let demo_ms = env_or("TAPJAM_DEMO_SECS", 30.0_f64) * 1000.0;
    let player = PlayerId::new(env_or("TAPJAM_PLAYER", "0xdemo".to_string()));
    log::info!("Seed {}, player {}", seed, player);

    let client = LocalScoringClient::new().with_latency(Duration::from_millis(150));
    let engine = Engine::new(Some(player), settings, seed)?;
    let mut runtime = Runtime::new(engine, Arc::new(client));
    let mut pilot = Autopilot::new(seed);

    let started = Instant::now();
    runtime.start(0.0)?;

    let mut ticker = tokio::time::interval(Duration::from_millis(16));
    loop {
        ticker.tick().await;
        let now_ms = started.elapsed().as_secs_f64() * 1000.0;

        // Hands off after the demo window so the next tile drops out
        if now_ms < demo_ms {
            if let Some(tap) = pilot.choose(runtime.engine().state()) {
                runtime.tap(tap, now_ms);
            }
        }
        runtime.frame(now_ms);

        for event in runtime.drain_events() {
            report(&event);
        }
        if runtime.engine().phase() == GamePhase::GameOver {
            break;
        }
    }

    runtime.settle().await;
    for event in runtime.drain_events() {
        report(&event);
    }

    let snapshot = runtime.snapshot();
    log::info!(
        "Run over: score {}, level {}, submitted {}",
        snapshot.stats.score,
        snapshot.stats.level,
        snapshot.submitted_score
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
