//! Tile lifecycle: spawn, advance, retire
//!
//! Tiles live in an id-keyed arena mutated in place. Ids and sequence numbers
//! are handed out monotonically and never reused within a run.

use std::collections::BTreeMap;

use rand::Rng;

use super::state::{Tile, TileId, TileState};

/// Tiles removed by a `retire` pass
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Retired {
    /// Hit tiles that scrolled off the field
    pub cleared: Vec<TileId>,
    /// Unhit tiles that crossed the threshold, in sequence order
    pub missed: Vec<Tile>,
}

#[derive(Debug, Clone, Default)]
pub struct TileSet {
    tiles: BTreeMap<TileId, Tile>,
    next_id: TileId,
    next_sequence: u64,
    last_lane: Option<u8>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    /// All tiles in id order
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn falling(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values().filter(|t| t.is_falling())
    }

    pub fn falling_count(&self) -> usize {
        self.falling().count()
    }

    /// The falling tile with the globally lowest sequence
    pub fn next_in_order(&self) -> Option<&Tile> {
        self.falling().min_by_key(|t| t.sequence)
    }

    /// The falling tile with the lowest sequence in `lane`
    pub fn lane_front(&self, lane: u8) -> Option<&Tile> {
        self.falling()
            .filter(|t| t.lane == lane)
            .min_by_key(|t| t.sequence)
    }

    /// Lane of the most recent spawn
    pub fn last_lane(&self) -> Option<u8> {
        self.last_lane
    }

    /// Uniform lane draw that rejects the previous spawn's lane.
    ///
    /// After `retry_budget` rejected draws the next draw is accepted as is, so
    /// a repeat is possible but vanishingly rare with more than one lane.
    pub fn pick_lane<R: Rng>(&self, rng: &mut R, lanes: u8, retry_budget: u32) -> u8 {
        let lanes = lanes.max(1);
        for _ in 0..retry_budget {
            let lane = rng.random_range(0..lanes);
            if Some(lane) != self.last_lane {
                return lane;
            }
        }
        let lane = rng.random_range(0..lanes);
        if Some(lane) == self.last_lane && lanes > 1 {
            log::debug!("Lane retry budget exhausted, repeating lane {}", lane);
        }
        lane
    }

    /// Create a falling tile at `position` with the next id and sequence
    pub fn spawn(&mut self, lane: u8, position: f32, speed: f32) -> &Tile {
        let id = self.next_id;
        self.next_id += 1;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.last_lane = Some(lane);

        self.tiles.entry(id).or_insert(Tile {
            id,
            lane,
            position,
            speed,
            sequence,
            state: TileState::Falling,
        })
    }

    /// Move every tile by `speed * dt`; hit tiles keep scrolling off
    pub fn advance(&mut self, dt: f32) {
        for tile in self.tiles.values_mut() {
            tile.position += tile.speed * dt;
        }
    }

    /// Mark a falling tile as hit. Returns false if it was not falling.
    pub fn mark_hit(&mut self, id: TileId) -> bool {
        match self.tiles.get_mut(&id) {
            Some(tile) if tile.is_falling() => {
                tile.state = TileState::Hit;
                true
            }
            _ => false,
        }
    }

    /// Remove every tile past `threshold`. Unhit tiles come back as `missed`
    /// so the caller can end the run in the same step.
    pub fn retire(&mut self, threshold: f32) -> Retired {
        let gone: Vec<TileId> = self
            .tiles
            .values()
            .filter(|t| t.position > threshold)
            .map(|t| t.id)
            .collect();

        let mut retired = Retired::default();
        for id in gone {
            let Some(mut tile) = self.tiles.remove(&id) else {
                continue;
            };
            match tile.state {
                TileState::Falling => {
                    tile.state = TileState::Expired;
                    retired.missed.push(tile);
                }
                TileState::Hit | TileState::Expired => retired.cleared.push(id),
            }
        }
        retired.missed.sort_by_key(|t| t.sequence);
        retired
    }
}
