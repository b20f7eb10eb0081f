use super::*;

impl GameSession {
    /// Adopts the queued turn when it is walkable, then advances one cell.
    pub(super) fn update_player(&mut self) {
        let cell = self.player.pos.cell();
        let queued = self.player.next_dir;
        if queued != Direction::None && self.maze.grid.step_from(cell, queued).is_some() {
            self.player.dir = queued;
            self.player.next_dir = Direction::None;
        }
        if let Some(next) = self.maze.grid.step_from(cell, self.player.dir) {
            self.player.pos = Position::from_cell(next);
        }
    }

    pub(super) fn update_ghosts(&mut self) {
        let player_cell = self.player.pos.cell();
        let player_dir = self.player.dir;
        let leader_cell = self
            .ghosts
            .iter()
            .find(|ghost| ghost.view.ghost_type == GhostType::Direct)
            .map(|ghost| ghost.view.pos.cell());

        for idx in 0..self.ghosts.len() {
            let ctx = AiContext {
                grid: &self.maze.grid,
                player_cell,
                player_dir,
                leader_cell,
                ghost_house: self.maze.ghost_house,
            };
            let ghost = &self.ghosts[idx];
            let cell = ghost.view.pos.cell();
            let dir = choose_ghost_direction(&ghost.view, ghost.home, &ctx, &mut self.rng);
            if let Some(next) = self.maze.grid.step_from(cell, dir) {
                self.ghosts[idx].view.pos = Position::from_cell(next);
                self.ghosts[idx].view.dir = dir;
            }
        }
    }

    /// Germs act on their own cadence, at most one cell per tick.
    pub(super) fn update_germs(&mut self, dt_ms: u64) {
        let player_cell = self.player.pos.cell();
        for idx in 0..self.germs.len() {
            let interval = get_germ_move_interval_ms(self.germs[idx].view.germ_trait);
            let timer = self.germs[idx].move_timer_ms.saturating_add(dt_ms);
            if timer < interval {
                self.germs[idx].move_timer_ms = timer;
                continue;
            }
            self.germs[idx].move_timer_ms = (timer - interval).min(interval);

            let cell = self.germs[idx].view.pos.cell();
            let action =
                choose_germ_action(&self.germs[idx].view, player_cell, &self.maze.grid, &mut self.rng);
            match action {
                GermAction::Hold => {}
                GermAction::Teleport => self.teleport_germ(idx, player_cell),
                GermAction::Step(dir) => {
                    let (dir, next) = match self.maze.grid.step_from(cell, dir) {
                        Some(next) => (dir, next),
                        None => {
                            let options = open_moves(&self.maze.grid, cell);
                            if options.is_empty() {
                                continue;
                            }
                            options[self.rng.pick_index(options.len())]
                        }
                    };
                    self.germs[idx].view.pos = Position::from_cell(next);
                    self.germs[idx].view.dir = dir;
                }
            }
        }
    }

    fn teleport_germ(&mut self, idx: usize, player_cell: Vec2) {
        let candidates = self.maze.grid.traversable_cells();
        let Some(cell) = sample_hazard_cell(
            &candidates,
            player_cell,
            SPAWN_PROTECTION_RADIUS,
            &HashSet::new(),
            PLACEMENT_MAX_ATTEMPTS,
            &mut self.rng,
        ) else {
            return;
        };
        let germ = &mut self.germs[idx];
        germ.view.pos = Position::from_cell(cell);
        germ.view.dir = random_direction(&mut self.rng);
        self.events.push(RuntimeEvent::GermTeleported {
            germ_id: germ.view.id.clone(),
            x: cell.x,
            y: cell.y,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GermTrait;
    use crate::constants::{GERM_MOVE_INTERVAL_MS, TICK_MS};

    fn bare_classic() -> GameSession {
        let mut session = GameSession::new(SessionConfig {
            maze_kind: MazeKind::Classic,
            seed: 31,
            ..SessionConfig::default()
        })
        .expect("maze builds");
        session.start().expect("start");
        session.ghosts.clear();
        session.germs.truncate(1);
        session
    }

    #[test]
    fn germ_moves_once_per_interval() {
        let mut session = bare_classic();
        session.germs[0].view.germ_trait = GermTrait::Patrol;
        session.germs[0].view.pos = Position::from_cell(Vec2::new(1, 19));
        session.germs[0].move_timer_ms = 0;

        session.update_germs(GERM_MOVE_INTERVAL_MS - 1);
        assert_eq!(session.germs[0].view.pos.cell(), Vec2::new(1, 19));
        session.update_germs(1);
        let moved = session.germs[0].view.pos.cell();
        assert_ne!(moved, Vec2::new(1, 19));
        assert!(session.maze.grid.is_walkable(moved.x, moved.y));

        session.update_germs(GERM_MOVE_INTERVAL_MS * 10);
        let cell = session.germs[0].view.pos.cell();
        assert!((moved.x - cell.x).abs() + (moved.y - cell.y).abs() <= 1);
    }

    #[test]
    fn germs_stay_on_walkable_cells() {
        let mut session = bare_classic();
        session.germs[0].view.germ_trait = GermTrait::Fast;
        for _ in 0..500 {
            session.update_germs(TICK_MS * 3);
            let cell = session.germs[0].view.pos.cell();
            assert!(session.maze.grid.is_walkable(cell.x, cell.y), "{cell:?}");
        }
    }
}
