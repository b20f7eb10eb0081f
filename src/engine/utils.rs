use std::collections::{HashMap, HashSet, VecDeque};

use crate::maze::Grid;
use crate::rng::RandomSource;
use crate::types::{Direction, Vec2};

pub(super) fn manhattan(a: Vec2, b: Vec2) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

pub(super) fn distance_sq(a: Vec2, b: Vec2) -> i32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

pub(super) fn distance(a: Vec2, b: Vec2) -> f32 {
    (distance_sq(a, b) as f32).sqrt()
}

pub(super) fn random_direction(rng: &mut impl RandomSource) -> Direction {
    match rng.int(0, 3) {
        0 => Direction::Up,
        1 => Direction::Down,
        2 => Direction::Left,
        _ => Direction::Right,
    }
}

/// Every walkable neighbour of `cell`, in probe order.
pub(super) fn open_moves(grid: &Grid, cell: Vec2) -> Vec<(Direction, Vec2)> {
    Direction::ALL
        .iter()
        .filter_map(|dir| grid.step_from(cell, *dir).map(|next| (*dir, next)))
        .collect()
}

/// First step of a shortest walk from `from` to the nearest cell accepted by
/// `is_goal`, and the walk length. Cells in `blocked` are never entered.
/// `None` when nothing matches or `from` is a goal.
pub(super) fn first_step_to<F>(
    grid: &Grid,
    from: Vec2,
    blocked: &HashSet<Vec2>,
    is_goal: F,
) -> Option<(Direction, i32)>
where
    F: Fn(Vec2) -> bool,
{
    if is_goal(from) {
        return None;
    }
    let mut first: HashMap<Vec2, (Direction, i32)> = HashMap::new();
    let mut queue = VecDeque::new();
    for (dir, next) in open_moves(grid, from) {
        if next == from || blocked.contains(&next) || first.contains_key(&next) {
            continue;
        }
        first.insert(next, (dir, 1));
        queue.push_back(next);
    }

    while let Some(cell) = queue.pop_front() {
        let (dir, depth) = first[&cell];
        if is_goal(cell) {
            return Some((dir, depth));
        }
        for (_, next) in open_moves(grid, cell) {
            if next == from || blocked.contains(&next) || first.contains_key(&next) {
                continue;
            }
            first.insert(next, (dir, depth + 1));
            queue.push_back(next);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::Cell;

    fn corridor() -> Grid {
        let mut grid = Grid::filled(7, 3, Cell::Wall);
        for x in 1..6 {
            grid.set(x, 1, Cell::Open);
        }
        grid
    }

    #[test]
    fn first_step_follows_the_corridor() {
        let grid = corridor();
        let open = HashSet::new();
        let step = first_step_to(&grid, Vec2::new(1, 1), &open, |cell| cell == Vec2::new(5, 1));
        assert_eq!(step, Some((Direction::Right, 4)));

        let blocked = HashSet::from([Vec2::new(3, 1)]);
        assert_eq!(
            first_step_to(&grid, Vec2::new(1, 1), &blocked, |cell| cell == Vec2::new(5, 1)),
            None
        );
    }

    #[test]
    fn first_step_is_none_when_unreachable_or_already_there() {
        let grid = corridor();
        let open = HashSet::new();
        assert_eq!(
            first_step_to(&grid, Vec2::new(1, 1), &open, |cell| cell == Vec2::new(0, 0)),
            None
        );
        assert_eq!(
            first_step_to(&grid, Vec2::new(3, 1), &open, |cell| cell == Vec2::new(3, 1)),
            None
        );
    }

    #[test]
    fn open_moves_respects_walls() {
        let grid = corridor();
        let moves = open_moves(&grid, Vec2::new(1, 1));
        assert_eq!(moves, vec![(Direction::Right, Vec2::new(2, 1))]);
    }
}
