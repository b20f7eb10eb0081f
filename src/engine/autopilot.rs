use super::*;

use super::utils::{first_step_to, manhattan};

impl GameSession {
    /// Greedy bot used by the simulator: walk to the nearest dot or fruit
    /// without stepping next to a live hazard, or through guarded cells when
    /// every route is guarded. Chases frightened ghosts when close.
    pub fn autopilot_direction(&self) -> Direction {
        let grid = &self.maze.grid;
        let from = self.player.pos.cell();

        let mut danger: HashSet<Vec2> = HashSet::new();
        let mut prey: HashSet<Vec2> = HashSet::new();
        let hazards = self
            .ghosts
            .iter()
            .filter(|ghost| matches!(ghost.view.mode, GhostMode::Scatter | GhostMode::Chase))
            .map(|ghost| ghost.view.pos.cell())
            .chain(self.germs.iter().map(|germ| germ.view.pos.cell()));
        for cell in hazards {
            danger.insert(cell);
            for (_, next) in open_moves(grid, cell) {
                danger.insert(next);
            }
        }
        for ghost in &self.ghosts {
            if ghost.view.mode == GhostMode::Frightened && self.power_timer_ms > POWER_MARGIN_MS {
                prey.insert(ghost.view.pos.cell());
            }
        }

        if !prey.is_empty() {
            if let Some((dir, depth)) = first_step_to(grid, from, &danger, |cell| prey.contains(&cell)) {
                if depth <= PREY_RADIUS {
                    return dir;
                }
            }
        }

        let fruit_cell = self.fruit.as_ref().map(|fruit| fruit.cell);
        let is_food = |cell: Vec2| self.dots.contains_key(&cell) || Some(cell) == fruit_cell;
        if let Some((dir, _)) = first_step_to(grid, from, &danger, is_food) {
            return dir;
        }
        if let Some((dir, _)) = first_step_to(grid, from, &HashSet::new(), is_food) {
            return dir;
        }

        // No food left to walk to; step to the neighbour farthest from the
        // closest hazard.
        let threats: Vec<Vec2> = danger.iter().copied().collect();
        open_moves(grid, from)
            .into_iter()
            .max_by_key(|(_, next)| {
                threats
                    .iter()
                    .map(|threat| manhattan(*threat, *next))
                    .min()
                    .unwrap_or(i32::MAX)
            })
            .map(|(dir, _)| dir)
            .unwrap_or(Direction::None)
    }
}

const POWER_MARGIN_MS: u64 = 1_000;
const PREY_RADIUS: i32 = 6;
