use std::collections::{BTreeMap, HashSet};

use crate::constants::{get_germ_count, GHOST_COUNT, PLACEMENT_MAX_ATTEMPTS, SPAWN_PROTECTION_RADIUS};
use crate::maze::{reachable_cells, Cell, MazeLayout};
use crate::rng::RandomSource;
use crate::types::{DotKind, GermTrait, GhostType, Vec2};

#[derive(Clone, Debug)]
pub struct PlacementConfig {
    pub ghost_count: usize,
    pub germ_count: usize,
    /// 1 puts a dot on every open cell, 2 on every other lattice cell.
    pub dot_spacing: i32,
    pub spawn_protection_radius: i32,
    pub max_attempts: usize,
    pub ghost_types: Vec<GhostType>,
    pub germ_traits: Vec<GermTrait>,
}

impl PlacementConfig {
    pub fn for_level(level: u32) -> Self {
        Self {
            ghost_count: GHOST_COUNT,
            germ_count: get_germ_count(level),
            ..Self::default()
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            ghost_count: GHOST_COUNT,
            germ_count: get_germ_count(1),
            dot_spacing: 1,
            spawn_protection_radius: SPAWN_PROTECTION_RADIUS,
            max_attempts: PLACEMENT_MAX_ATTEMPTS,
            ghost_types: GhostType::ALL.to_vec(),
            germ_traits: GermTrait::ALL.to_vec(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Placement {
    pub dots: BTreeMap<Vec2, DotKind>,
    pub ghosts: Vec<(GhostType, Vec2)>,
    pub germs: Vec<(GermTrait, Vec2)>,
}

pub fn in_spawn_zone(cell: Vec2, spawn: Vec2, radius: i32) -> bool {
    (cell.x - spawn.x).abs() <= radius && (cell.y - spawn.y).abs() <= radius
}

/// Dots on the spacing lattice plus the layout's power cells. Cells inside the
/// spawn zone or unreachable from the spawn get nothing.
pub fn place_dots(layout: &MazeLayout, config: &PlacementConfig) -> BTreeMap<Vec2, DotKind> {
    let grid = &layout.grid;
    let spacing = config.dot_spacing.max(1);
    let reachable = reachable_cells(grid, layout.spawn);
    let mut dots = BTreeMap::new();

    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let cell = Vec2 { x, y };
            if grid.get(x, y) != Some(Cell::Open)
                || (x - 1).rem_euclid(spacing) != 0
                || (y - 1).rem_euclid(spacing) != 0
                || in_spawn_zone(cell, layout.spawn, config.spawn_protection_radius)
                || !reachable.contains(&cell)
            {
                continue;
            }
            dots.insert(cell, DotKind::Normal);
        }
    }

    for cell in &layout.power_cells {
        if grid.get(cell.x, cell.y) != Some(Cell::Open)
            || in_spawn_zone(*cell, layout.spawn, config.spawn_protection_radius)
            || !reachable.contains(cell)
        {
            continue;
        }
        dots.insert(*cell, DotKind::Power);
    }

    dots
}

/// Bounded rejection sampling. After `max_attempts` misses the last sample is
/// returned even if it sits in the spawn zone or on another hazard.
pub fn sample_hazard_cell(
    candidates: &[Vec2],
    spawn: Vec2,
    radius: i32,
    occupied: &HashSet<Vec2>,
    max_attempts: usize,
    rng: &mut impl RandomSource,
) -> Option<Vec2> {
    if candidates.is_empty() {
        return None;
    }
    let mut last = candidates[rng.pick_index(candidates.len())];
    for attempt in 0..max_attempts.max(1) {
        if attempt > 0 {
            last = candidates[rng.pick_index(candidates.len())];
        }
        if !in_spawn_zone(last, spawn, radius) && !occupied.contains(&last) {
            return Some(last);
        }
    }
    Some(last)
}

pub fn place_entities(
    layout: &MazeLayout,
    config: &PlacementConfig,
    rng: &mut impl RandomSource,
) -> Placement {
    let dots = place_dots(layout, config);
    let candidates = layout.grid.traversable_cells();
    let mut occupied = HashSet::new();
    occupied.insert(layout.spawn);

    let mut ghosts = Vec::new();
    if !config.ghost_types.is_empty() {
        for idx in 0..config.ghost_count {
            let Some(cell) = sample_hazard_cell(
                &candidates,
                layout.spawn,
                config.spawn_protection_radius,
                &occupied,
                config.max_attempts,
                rng,
            ) else {
                break;
            };
            occupied.insert(cell);
            ghosts.push((config.ghost_types[idx % config.ghost_types.len()], cell));
        }
    }

    let mut germs = Vec::new();
    if !config.germ_traits.is_empty() {
        for idx in 0..config.germ_count {
            let Some(cell) = sample_hazard_cell(
                &candidates,
                layout.spawn,
                config.spawn_protection_radius,
                &occupied,
                config.max_attempts,
                rng,
            ) else {
                break;
            };
            occupied.insert(cell);
            germs.push((config.germ_traits[idx % config.germ_traits.len()], cell));
        }
    }

    Placement { dots, ghosts, germs }
}
