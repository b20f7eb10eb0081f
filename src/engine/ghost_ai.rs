//! Ghost steering. Pure functions of the ghost, the grid and a world context;
//! randomness only breaks ties and drives frightened wandering.

use std::collections::HashSet;

use crate::constants::{AMBUSH_LOOKAHEAD, PATTERN_LOOKAHEAD, SWITCH_FLEE_RADIUS};
use crate::maze::Grid;
use crate::rng::RandomSource;
use crate::types::{Direction, GhostMode, GhostType, GhostView, Vec2};

use super::utils::{distance, distance_sq, first_step_to, open_moves};

pub struct AiContext<'a> {
    pub grid: &'a Grid,
    pub player_cell: Vec2,
    pub player_dir: Direction,
    /// Cell of the first `Direct` ghost, the pivot for `Pattern`.
    pub leader_cell: Option<Vec2>,
    pub ghost_house: Vec2,
}

/// Scatter targets. The right-hand corners sit one column in from the edge,
/// matching the arcade layout's targets; left-hand ones are on the edge.
pub fn home_corner(grid: &Grid, ghost_type: GhostType) -> Vec2 {
    let right = (grid.width() - 2).max(0);
    let bottom = (grid.height() - 1).max(0);
    match ghost_type {
        GhostType::Direct => Vec2::new(right, 0),
        GhostType::Ambush => Vec2::new(0, 0),
        GhostType::Pattern => Vec2::new(right, bottom),
        GhostType::Switch => Vec2::new(0, bottom),
    }
}

/// Walkable moves from `cell`. The reverse of `heading` is left out unless it
/// is the only way on.
pub fn legal_moves(grid: &Grid, cell: Vec2, heading: Direction) -> Vec<(Direction, Vec2)> {
    let all = open_moves(grid, cell);
    if heading == Direction::None {
        return all;
    }
    let reverse = heading.opposite();
    let forward: Vec<(Direction, Vec2)> =
        all.iter().copied().filter(|(dir, _)| *dir != reverse).collect();
    if forward.is_empty() {
        all
    } else {
        forward
    }
}

pub fn chase_target(ghost_type: GhostType, ghost_cell: Vec2, home: Vec2, ctx: &AiContext) -> Vec2 {
    let player = ctx.player_cell;
    match ghost_type {
        GhostType::Direct => player,
        GhostType::Ambush => player.offset(ctx.player_dir, AMBUSH_LOOKAHEAD),
        GhostType::Pattern => {
            let pivot = player.offset(ctx.player_dir, PATTERN_LOOKAHEAD);
            let leader = ctx.leader_cell.unwrap_or(ghost_cell);
            Vec2::new(pivot.x * 2 - leader.x, pivot.y * 2 - leader.y)
        }
        GhostType::Switch => {
            if distance(ghost_cell, player) < SWITCH_FLEE_RADIUS {
                home
            } else {
                player
            }
        }
    }
}

/// Move minimising squared distance to `target`; equal candidates are broken
/// at random.
pub fn pick_closest(
    moves: &[(Direction, Vec2)],
    target: Vec2,
    rng: &mut impl RandomSource,
) -> Direction {
    let Some(best) = moves.iter().map(|(_, next)| distance_sq(*next, target)).min() else {
        return Direction::None;
    };
    let tied: Vec<Direction> = moves
        .iter()
        .filter(|(_, next)| distance_sq(*next, target) == best)
        .map(|(dir, _)| *dir)
        .collect();
    tied[rng.pick_index(tied.len())]
}

/// Direction for the next step, or `Direction::None` to hold.
pub fn choose_ghost_direction(
    ghost: &GhostView,
    home: Vec2,
    ctx: &AiContext,
    rng: &mut impl RandomSource,
) -> Direction {
    let cell = ghost.pos.cell();
    match ghost.mode {
        GhostMode::Eaten => first_step_to(ctx.grid, cell, &HashSet::new(), |c| c == ctx.ghost_house)
            .map(|(dir, _)| dir)
            .unwrap_or(Direction::None),
        GhostMode::Frightened => {
            let moves = legal_moves(ctx.grid, cell, ghost.dir);
            if moves.is_empty() {
                return Direction::None;
            }
            moves[rng.pick_index(moves.len())].0
        }
        GhostMode::Scatter => pick_closest(&legal_moves(ctx.grid, cell, ghost.dir), home, rng),
        GhostMode::Chase => {
            let target = chase_target(ghost.ghost_type, cell, home, ctx);
            pick_closest(&legal_moves(ctx.grid, cell, ghost.dir), target, rng)
        }
    }
}
