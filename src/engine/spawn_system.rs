use super::*;

impl GameSession {
    /// Fresh dots and hazards for the current maze. Score, lives and stats carry over.
    pub(super) fn populate_level(&mut self) {
        let placement_config = self
            .config
            .placement
            .clone()
            .unwrap_or_else(|| PlacementConfig::for_level(self.level));
        let placement = place_entities(&self.maze, &placement_config, &mut self.rng);
        let spawn = self.maze.spawn;

        self.dots = placement.dots;
        self.player = PlayerView {
            pos: Position::from_cell(spawn),
            dir: Direction::None,
            next_dir: Direction::None,
        };

        self.ghosts.clear();
        for (ghost_type, cell) in placement.ghosts {
            let id = self.make_id("ghost");
            self.ghosts.push(GhostInternal {
                view: GhostView {
                    id,
                    pos: Position::from_cell(cell),
                    dir: Direction::None,
                    ghost_type,
                    mode: GhostMode::Scatter,
                },
                spawn: cell,
                home: home_corner(&self.maze.grid, ghost_type),
                eaten_timer_ms: 0,
            });
        }

        self.germs.clear();
        for (germ_trait, cell) in placement.germs {
            let id = self.make_id("germ");
            let dir = random_direction(&mut self.rng);
            self.germs.push(GermInternal {
                view: GermView {
                    id,
                    pos: Position::from_cell(cell),
                    dir,
                    germ_trait,
                },
                spawn: cell,
                move_timer_ms: 0,
            });
        }

        self.global_mode = GhostMode::Scatter;
        self.mode_timer_ms = SCATTER_DURATION_MS;
        self.power_timer_ms = 0;
        self.ghosts_eaten_in_power = 0;
        self.fruit = None;
        self.last_fruit_threshold = None;
        self.pending = None;

        debug!(
            level = self.level,
            dots = self.dots.len(),
            ghosts = self.ghosts.len(),
            germs = self.germs.len(),
            "level_populated"
        );
    }

    pub(super) fn update_pending(&mut self, dt_ms: u64) {
        let Some(pending) = self.pending else {
            return;
        };
        match pending {
            PendingTransition::Respawn { remaining_ms } => {
                let remaining_ms = remaining_ms.saturating_sub(dt_ms);
                if remaining_ms > 0 {
                    self.pending = Some(PendingTransition::Respawn { remaining_ms });
                } else {
                    self.pending = None;
                    self.respawn_after_catch();
                }
            }
            PendingTransition::NextLevel { remaining_ms } => {
                let remaining_ms = remaining_ms.saturating_sub(dt_ms);
                if remaining_ms > 0 {
                    self.pending = Some(PendingTransition::NextLevel { remaining_ms });
                } else {
                    self.pending = None;
                    self.advance_level();
                }
            }
        }
    }

    /// Everyone back to their spawn cell; dots and fruit stay as they are.
    fn respawn_after_catch(&mut self) {
        let spawn = self.maze.spawn;
        self.player = PlayerView {
            pos: Position::from_cell(spawn),
            dir: Direction::None,
            next_dir: Direction::None,
        };
        for ghost in self.ghosts.iter_mut() {
            ghost.view.pos = Position::from_cell(ghost.spawn);
            ghost.view.dir = Direction::None;
            ghost.view.mode = GhostMode::Scatter;
            ghost.eaten_timer_ms = 0;
        }
        for idx in 0..self.germs.len() {
            let dir = random_direction(&mut self.rng);
            let germ = &mut self.germs[idx];
            germ.view.pos = Position::from_cell(germ.spawn);
            germ.view.dir = dir;
            germ.move_timer_ms = 0;
        }
        self.global_mode = GhostMode::Scatter;
        self.mode_timer_ms = SCATTER_DURATION_MS;
        self.power_timer_ms = 0;
        self.ghosts_eaten_in_power = 0;

        debug!(lives = self.lives, tick = self.tick_counter, "player_respawned");
        self.events.push(RuntimeEvent::PlayerRespawned);
    }

    fn advance_level(&mut self) {
        self.level = (self.level + 1).min(self.config.max_level);
        match build_level_maze(
            self.config.maze_kind,
            self.level,
            self.config.seed,
            &self.config.maze_options,
        ) {
            Ok(maze) => self.maze = maze,
            Err(error) => {
                warn!(%error, level = self.level, "level_maze_failed_reusing_layout");
                self.maze.level = self.level;
            }
        }
        self.populate_level();

        info!(
            level = self.level,
            score = self.score,
            lives = self.lives,
            width = self.maze.grid.width(),
            height = self.maze.grid.height(),
            "level_started"
        );
        self.events.push(RuntimeEvent::LevelStarted { level: self.level });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_level_gets_a_taller_maze_and_more_germs() {
        let mut session = GameSession::new(SessionConfig {
            seed: 5,
            ..SessionConfig::default()
        })
        .expect("maze builds");
        session.start().expect("start");
        let height = session.maze.grid.height();
        let germs = session.germs.len();

        session.dots.clear();
        session.advance_level();
        assert_eq!(session.level(), 2);
        assert!(session.maze.grid.height() > height);
        assert!(session.germs.len() > germs);
        assert!(session.dots_remaining() > 0);
        assert!(session
            .drain_events()
            .iter()
            .any(|event| matches!(event, RuntimeEvent::LevelStarted { level: 2 })));
    }

    #[test]
    fn placement_override_replaces_level_table() {
        let session = GameSession::new(SessionConfig {
            seed: 8,
            placement: Some(PlacementConfig {
                ghost_count: 0,
                germ_count: 2,
                ..PlacementConfig::default()
            }),
            ..SessionConfig::default()
        })
        .expect("maze builds");
        assert!(session.ghosts.is_empty());
        assert_eq!(session.germs.len(), 2);
    }

    #[test]
    fn hazards_start_outside_spawn_zone() {
        let session = GameSession::new(SessionConfig {
            seed: 12,
            ..SessionConfig::default()
        })
        .expect("maze builds");
        let spawn = session.maze.spawn;
        for cell in session
            .ghosts
            .iter()
            .map(|g| g.view.pos.cell())
            .chain(session.germs.iter().map(|g| g.view.pos.cell()))
        {
            assert!(!crate::placement::in_spawn_zone(cell, spawn, SPAWN_PROTECTION_RADIUS));
        }
    }
}
