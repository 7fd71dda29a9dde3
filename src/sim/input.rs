//! Tap classification
//!
//! Pure functions over the tile set: they decide what a tap means but never
//! mutate anything. `tick::tap` applies the verdict.

use serde::{Deserialize, Serialize};

use super::state::{Fault, TileId, TileState};
use super::tiles::TileSet;
use crate::settings::OrderRule;

/// A player tap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Tap {
    /// Tap on a specific tile
    Tile(TileId),
    /// Tap on a lane at a vertical field coordinate
    Lane { lane: u8, y: f32 },
}

/// Verdict for one tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// The tile is consumed and scores +1
    Hit(TileId),
    /// Run-ending mistake
    Fault(Fault),
    /// Stale or duplicate input; dropped silently
    Ignored,
}

/// Classify a direct tap on `id`
pub fn classify_tile_tap(tiles: &TileSet, id: TileId, rule: OrderRule) -> TapOutcome {
    let Some(tapped) = tiles.get(id).filter(|t| t.is_falling()) else {
        return TapOutcome::Ignored;
    };

    let expected = match rule {
        OrderRule::Sequence => tiles.next_in_order(),
        OrderRule::LaneFront => tiles.lane_front(tapped.lane),
    };

    match expected {
        Some(expected) if expected.id == id => TapOutcome::Hit(id),
        Some(expected) => TapOutcome::Fault(Fault::WrongOrder {
            tapped: id,
            expected: expected.id,
        }),
        // Unreachable while `tapped` is falling
        None => TapOutcome::Ignored,
    }
}

/// Resolve a lane tap to the falling tile under `y`, if any
pub fn tile_at(tiles: &TileSet, lane: u8, y: f32, tile_height: f32) -> Option<TileId> {
    tiles
        .falling()
        .filter(|t| t.lane == lane && t.covers(y, tile_height))
        .min_by_key(|t| t.sequence)
        .map(|t| t.id)
}

/// Classify a lane tap. A falling tile under the finger is judged as a
/// direct tap, a tile already hit swallows the tap, and empty space ends
/// the run.
pub fn classify_lane_tap(
    tiles: &TileSet,
    lane: u8,
    y: f32,
    lanes: u8,
    tile_height: f32,
    rule: OrderRule,
) -> TapOutcome {
    if lane >= lanes {
        return TapOutcome::Ignored;
    }
    if let Some(id) = tile_at(tiles, lane, y, tile_height) {
        return classify_tile_tap(tiles, id, rule);
    }
    let on_hit_tile = tiles
        .iter()
        .any(|t| t.lane == lane && t.state == TileState::Hit && t.covers(y, tile_height));
    if on_hit_tile {
        TapOutcome::Ignored
    } else {
        TapOutcome::Fault(Fault::EmptyTap { lane })
    }
}
