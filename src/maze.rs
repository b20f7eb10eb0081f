use std::collections::{HashSet, VecDeque};

use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::MAZE_MAX_ATTEMPTS;
use crate::rng::{MazeRng, RandomSource};
use crate::types::{Direction, MazeKind, Vec2, WorldInit};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Wall,
    /// Traversable and eligible for a dot.
    Open,
    /// Traversable, never holds a dot.
    Empty,
    GhostHouse,
}

impl Cell {
    pub fn is_traversable(self) -> bool {
        self != Cell::Wall
    }

    fn glyph(self) -> char {
        match self {
            Cell::Wall => '#',
            Cell::Open => '.',
            Cell::Empty => ' ',
            Cell::GhostHouse => '-',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    tunnels: bool,
}

impl Grid {
    pub fn filled(width: i32, height: i32, cell: Cell) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cells: vec![cell; (width * height) as usize],
            tunnels: false,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn has_tunnels(&self) -> bool {
        self.tunnels
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        self.index(x, y).map(|idx| self.cells[idx])
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = cell;
        }
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.get(x, y).map(Cell::is_traversable).unwrap_or(false)
    }

    pub fn is_border(&self, x: i32, y: i32) -> bool {
        x == 0 || y == 0 || x == self.width - 1 || y == self.height - 1
    }

    /// Cell reached by one step, wrapping horizontally on tunnel grids.
    /// `None` when the step is blocked or `dir` is `Direction::None`.
    pub fn step_from(&self, from: Vec2, dir: Direction) -> Option<Vec2> {
        if dir == Direction::None {
            return None;
        }
        let mut next = from.offset(dir, 1);
        if self.tunnels && (next.x < 0 || next.x >= self.width) {
            next.x = next.x.rem_euclid(self.width);
        }
        self.is_walkable(next.x, next.y).then_some(next)
    }

    pub fn traversable_cells(&self) -> Vec<Vec2> {
        let mut out = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_walkable(x, y) {
                    out.push(Vec2 { x, y });
                }
            }
        }
        out
    }

    pub fn tiles(&self) -> Vec<String> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|cell| cell.glyph()).collect::<String>())
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct MazeLayout {
    pub kind: MazeKind,
    pub level: u32,
    pub seed: u32,
    pub grid: Grid,
    pub spawn: Vec2,
    pub ghost_house: Vec2,
    pub power_cells: Vec<Vec2>,
}

#[derive(Clone, Copy, Debug)]
pub struct MazeOptions {
    pub cols: i32,
    pub base_rows: i32,
    pub rows_per_level: i32,
}

impl Default for MazeOptions {
    fn default() -> Self {
        Self {
            cols: 19,
            base_rows: 21,
            rows_per_level: 4,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("spawn ({}, {}) stayed blocked after {attempts} attempts at level {level}", spawn.x, spawn.y)]
    SpawnBlocked {
        level: u32,
        spawn: Vec2,
        attempts: u32,
    },
    #[error("layout row {row} has width {found}, expected {expected}")]
    MalformedLayout {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("layout glyph {glyph:?} at ({x}, {y}) is not recognised")]
    UnknownGlyph { glyph: char, x: i32, y: i32 },
}

const CLASSIC_LAYOUT: [&str; 21] = [
    "###################",
    "#........#........#",
    "#o##.###.#.###.##o#",
    "#.................#",
    "#.##.#.#####.#.##.#",
    "#....#...#...#....#",
    "####.### # ###.####",
    "####.#       #.####",
    "####.# #---# #.####",
    "    .  #---#  .    ",
    "####.# ##### #.####",
    "####.#       #.####",
    "####.### # ###.####",
    "#........#........#",
    "#.##.###.#.###.##.#",
    "#o.#...........#.o#",
    "##.#.#.#####.#.#.##",
    "#....#...#...#....#",
    "#.######.#.######.#",
    "#.................#",
    "###################",
];
const CLASSIC_SPAWN: Vec2 = Vec2::new(9, 15);
const CLASSIC_GHOST_HOUSE: Vec2 = Vec2::new(9, 9);

pub fn get_row_count(level: u32, options: &MazeOptions) -> i32 {
    let extra = (level.max(1) as i32 - 1) * options.rows_per_level.max(0);
    force_odd(options.base_rows + extra).max(7)
}

/// Randomized depth-first carve over the odd lattice. Every odd cell ends up
/// open and reachable from every other.
pub fn generate_maze(level: u32, seed: u32, options: &MazeOptions) -> MazeLayout {
    let level = level.max(1);
    let rows = get_row_count(level, options);
    let cols = force_odd(options.cols).max(7);
    let mut rng = MazeRng::for_level(level, seed);
    let mut grid = Grid::filled(cols, rows, Cell::Wall);

    let start = Vec2 {
        x: random_odd_coordinate(cols, &mut rng),
        y: random_odd_coordinate(rows, &mut rng),
    };
    carve_passages(&mut grid, start, &mut rng);

    let spawn = bottom_center_spawn(&grid);
    clear_spawn_box(&mut grid, spawn);
    finish_layout(MazeKind::Carved, level, seed, grid, spawn)
}

/// Open field with seeded wall clusters and blocks. Connectivity is not
/// guaranteed; only the border and the spawn box are forced.
pub fn generate_scatter_maze(level: u32, seed: u32, options: &MazeOptions) -> MazeLayout {
    let level = level.max(1);
    let rows = get_row_count(level, options);
    let cols = force_odd(options.cols).max(7);
    let mut rng = MazeRng::for_level(level, seed);
    let mut grid = Grid::filled(cols, rows, Cell::Open);
    let area = (cols - 2) * (rows - 2);

    for _ in 0..(area / 40).max(1) {
        let mut cell = Vec2 {
            x: rng.int(1, cols - 2),
            y: rng.int(1, rows - 2),
        };
        for _ in 0..rng.int(2, 5) {
            grid.set(cell.x, cell.y, Cell::Wall);
            let dir = Direction::ALL[rng.pick_index(Direction::ALL.len())];
            let next = cell.offset(dir, 1);
            cell = Vec2 {
                x: next.x.clamp(1, cols - 2),
                y: next.y.clamp(1, rows - 2),
            };
        }
    }

    for _ in 0..(area / 80).max(1) {
        let block_w = rng.int(2, 4);
        let block_h = rng.int(1, 2);
        let x0 = rng.int(1, cols - 2);
        let y0 = rng.int(1, rows - 2);
        for y in y0..(y0 + block_h).min(rows - 1) {
            for x in x0..(x0 + block_w).min(cols - 1) {
                grid.set(x, y, Cell::Wall);
            }
        }
    }

    for x in 0..cols {
        grid.set(x, 0, Cell::Wall);
        grid.set(x, rows - 1, Cell::Wall);
    }
    for y in 0..rows {
        grid.set(0, y, Cell::Wall);
        grid.set(cols - 1, y, Cell::Wall);
    }

    let spawn = bottom_center_spawn(&grid);
    clear_spawn_box(&mut grid, spawn);
    finish_layout(MazeKind::Scattered, level, seed, grid, spawn)
}

/// Fixed arcade board with side tunnels on rows 7, 9 and 11.
pub fn classic_maze(level: u32) -> Result<MazeLayout, MazeError> {
    let (mut grid, power_cells) = parse_layout(&CLASSIC_LAYOUT)?;
    grid.tunnels = true;
    Ok(MazeLayout {
        kind: MazeKind::Classic,
        level: level.max(1),
        seed: 0,
        grid,
        spawn: CLASSIC_SPAWN,
        ghost_house: CLASSIC_GHOST_HOUSE,
        power_cells,
    })
}

pub fn build_level_maze(
    kind: MazeKind,
    level: u32,
    seed: u32,
    options: &MazeOptions,
) -> Result<MazeLayout, MazeError> {
    match kind {
        MazeKind::Carved => {
            regenerate_until_valid(level, seed, |level, seed| Ok(generate_maze(level, seed, options)))
        }
        MazeKind::Scattered => regenerate_until_valid(level, seed, |level, seed| {
            Ok(generate_scatter_maze(level, seed, options))
        }),
        MazeKind::Classic => regenerate_until_valid(level, seed, |level, _| classic_maze(level)),
    }
}

fn regenerate_until_valid<F>(level: u32, seed: u32, mut generate: F) -> Result<MazeLayout, MazeError>
where
    F: FnMut(u32, u32) -> Result<MazeLayout, MazeError>,
{
    let mut last_spawn = Vec2::new(0, 0);
    for attempt in 0..MAZE_MAX_ATTEMPTS {
        let attempt_seed = seed.wrapping_add(attempt.wrapping_mul(104_729));
        let layout = generate(level, attempt_seed)?;
        if validate_spawn(&layout) {
            if attempt > 0 {
                debug!(level, attempt, "maze regenerated with open spawn");
            }
            return Ok(layout);
        }
        warn!(
            level,
            attempt,
            spawn_x = layout.spawn.x,
            spawn_y = layout.spawn.y,
            "maze spawn blocked; regenerating"
        );
        last_spawn = layout.spawn;
    }
    Err(MazeError::SpawnBlocked {
        level,
        spawn: last_spawn,
        attempts: MAZE_MAX_ATTEMPTS,
    })
}

/// Spawn is open and has at least one way out.
pub fn validate_spawn(layout: &MazeLayout) -> bool {
    let grid = &layout.grid;
    grid.is_walkable(layout.spawn.x, layout.spawn.y)
        && Direction::ALL
            .iter()
            .any(|dir| grid.step_from(layout.spawn, *dir).is_some())
}

pub fn reachable_cells(grid: &Grid, start: Vec2) -> HashSet<Vec2> {
    let mut out = HashSet::new();
    if !grid.is_walkable(start.x, start.y) {
        return out;
    }

    let mut queue = VecDeque::new();
    out.insert(start);
    queue.push_back(start);

    while let Some(cell) = queue.pop_front() {
        for dir in Direction::ALL {
            let Some(next) = grid.step_from(cell, dir) else {
                continue;
            };
            if out.insert(next) {
                queue.push_back(next);
            }
        }
    }

    out
}

pub fn find_nearest_open(grid: &Grid, target: Vec2, avoid: &HashSet<Vec2>) -> Option<Vec2> {
    let mut best: Option<(i32, i32, i32, Vec2)> = None;
    for cell in grid.traversable_cells() {
        if avoid.contains(&cell) {
            continue;
        }
        let dist = (cell.x - target.x).abs() + (cell.y - target.y).abs();
        let key = (dist, cell.y, cell.x, cell);
        if best
            .map(|v| (v.0, v.1, v.2) > (key.0, key.1, key.2))
            .unwrap_or(true)
        {
            best = Some(key);
        }
    }
    best.map(|(_, _, _, cell)| cell)
}

pub fn to_world_init(layout: &MazeLayout) -> WorldInit {
    WorldInit {
        width: layout.grid.width(),
        height: layout.grid.height(),
        kind: layout.kind,
        level: layout.level,
        tunnels: layout.grid.has_tunnels(),
        tiles: layout.grid.tiles(),
        spawn: layout.spawn,
        ghost_house: layout.ghost_house,
    }
}

fn force_odd(value: i32) -> i32 {
    if value % 2 == 0 {
        value + 1
    } else {
        value
    }
}

fn random_odd_coordinate(extent: i32, rng: &mut impl RandomSource) -> i32 {
    let mut value = (rng.next_f32() * (extent - 2) as f32).floor() as i32 + 1;
    if value % 2 == 0 {
        value -= 1;
    }
    value.max(1)
}

fn carve_passages(grid: &mut Grid, start: Vec2, rng: &mut impl RandomSource) {
    grid.set(start.x, start.y, Cell::Open);
    let mut stack = vec![start];

    while let Some(&current) = stack.last() {
        let mut neighbors = Vec::with_capacity(4);
        for dir in Direction::ALL {
            let next = current.offset(dir, 2);
            let inside = next.x > 0
                && next.y > 0
                && next.x < grid.width() - 1
                && next.y < grid.height() - 1;
            if inside && grid.get(next.x, next.y) == Some(Cell::Wall) {
                neighbors.push((dir, next));
            }
        }

        if neighbors.is_empty() {
            stack.pop();
            continue;
        }
        let (dir, next) = neighbors[rng.pick_index(neighbors.len())];
        let between = current.offset(dir, 1);
        grid.set(between.x, between.y, Cell::Open);
        grid.set(next.x, next.y, Cell::Open);
        stack.push(next);
    }
}

fn bottom_center_spawn(grid: &Grid) -> Vec2 {
    Vec2 {
        x: grid.width() / 2,
        y: grid.height() - 2,
    }
}

/// Opens the 3x3 box around the spawn, leaving the outer ring intact.
fn clear_spawn_box(grid: &mut Grid, spawn: Vec2) {
    for y in (spawn.y - 1)..=(spawn.y + 1) {
        for x in (spawn.x - 1)..=(spawn.x + 1) {
            if grid.get(x, y).is_none() || grid.is_border(x, y) {
                continue;
            }
            grid.set(x, y, Cell::Open);
        }
    }
}

fn finish_layout(kind: MazeKind, level: u32, seed: u32, grid: Grid, spawn: Vec2) -> MazeLayout {
    let mut avoid = HashSet::new();
    avoid.insert(spawn);

    let center = Vec2 {
        x: grid.width() / 2,
        y: grid.height() / 2,
    };
    let ghost_house = find_nearest_open(&grid, center, &avoid).unwrap_or(spawn);
    avoid.insert(ghost_house);

    let corners = [
        Vec2::new(1, 1),
        Vec2::new(grid.width() - 2, 1),
        Vec2::new(1, grid.height() - 2),
        Vec2::new(grid.width() - 2, grid.height() - 2),
    ];
    let mut power_cells = Vec::new();
    for corner in corners {
        if let Some(cell) = find_nearest_open(&grid, corner, &avoid) {
            avoid.insert(cell);
            power_cells.push(cell);
        }
    }

    MazeLayout {
        kind,
        level,
        seed,
        grid,
        spawn,
        ghost_house,
        power_cells,
    }
}

fn parse_layout(rows: &[&str]) -> Result<(Grid, Vec<Vec2>), MazeError> {
    let width = rows.first().map(|row| row.chars().count()).unwrap_or(0);
    let mut grid = Grid::filled(width as i32, rows.len() as i32, Cell::Wall);
    let mut power_cells = Vec::new();

    for (y, row) in rows.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(MazeError::MalformedLayout {
                row: y,
                found,
                expected: width,
            });
        }
        for (x, glyph) in row.chars().enumerate() {
            let (x, y) = (x as i32, y as i32);
            let cell = match glyph {
                '#' => Cell::Wall,
                '.' => Cell::Open,
                'o' => {
                    power_cells.push(Vec2 { x, y });
                    Cell::Open
                }
                ' ' => Cell::Empty,
                '-' => Cell::GhostHouse,
                _ => return Err(MazeError::UnknownGlyph { glyph, x, y }),
            };
            grid.set(x, y, cell);
        }
    }

    Ok((grid, power_cells))
}
