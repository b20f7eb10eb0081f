//! Germ behaviour: cheap wanderers that only differ by re-roll odds, cadence
//! and two special moves.

use crate::constants::{get_germ_turn_chance, SMART_HUNTER_RADIUS, TELEPORT_CHANCE};
use crate::maze::Grid;
use crate::rng::RandomSource;
use crate::types::{Direction, GermTrait, GermView, Vec2};

use super::utils::{distance, open_moves, random_direction};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GermAction {
    Step(Direction),
    Teleport,
    Hold,
}

pub fn choose_germ_action(
    germ: &GermView,
    player_cell: Vec2,
    grid: &Grid,
    rng: &mut impl RandomSource,
) -> GermAction {
    let cell = germ.pos.cell();
    if open_moves(grid, cell).is_empty() {
        return GermAction::Hold;
    }
    match germ.germ_trait {
        GermTrait::Teleporter if rng.bool(TELEPORT_CHANCE) => GermAction::Teleport,
        GermTrait::SmartHunter if distance(cell, player_cell) < SMART_HUNTER_RADIUS => {
            match toward_on_axis(grid, cell, player_cell) {
                Some(dir) => GermAction::Step(dir),
                None => wander(germ, rng),
            }
        }
        _ => wander(germ, rng),
    }
}

fn wander(germ: &GermView, rng: &mut impl RandomSource) -> GermAction {
    if germ.dir == Direction::None || rng.bool(get_germ_turn_chance(germ.germ_trait)) {
        GermAction::Step(random_direction(rng))
    } else {
        GermAction::Step(germ.dir)
    }
}

/// Greedy step along the dominant axis, falling back to the other axis.
fn toward_on_axis(grid: &Grid, from: Vec2, to: Vec2) -> Option<Direction> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let horizontal = match dx.signum() {
        1 => Some(Direction::Right),
        -1 => Some(Direction::Left),
        _ => None,
    };
    let vertical = match dy.signum() {
        1 => Some(Direction::Down),
        -1 => Some(Direction::Up),
        _ => None,
    };
    let order = if dx.abs() >= dy.abs() {
        [horizontal, vertical]
    } else {
        [vertical, horizontal]
    };
    order
        .into_iter()
        .flatten()
        .find(|dir| grid.step_from(from, *dir).is_some())
}
