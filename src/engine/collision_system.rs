use super::*;

impl GameSession {
    pub(super) fn collect_pickups(&mut self) {
        let cell = self.player.pos.cell();
        if let Some(kind) = self.dots.remove(&cell) {
            self.stats.dots_collected += 1;
            let power = kind == DotKind::Power;
            self.events.push(RuntimeEvent::DotCollected {
                x: cell.x,
                y: cell.y,
                power,
            });
            if power {
                self.add_score(POWER_DOT_SCORE);
                self.activate_power_mode();
            } else {
                self.add_score(DOT_SCORE);
            }
            self.maybe_spawn_fruit();
        }

        if self.fruit.as_ref().is_some_and(|fruit| fruit.cell == cell) {
            if let Some(fruit) = self.fruit.take() {
                self.stats.fruits_eaten += 1;
                self.add_score(fruit.view.points);
                self.events.push(RuntimeEvent::FruitEaten {
                    fruit_id: fruit.view.id,
                    fruit_type: fruit.view.fruit_type,
                    points: fruit.view.points,
                });
            }
        }
    }

    /// Epsilon overlap or a swap of cells during this tick counts as contact.
    pub(super) fn resolve_hazard_collisions(
        &mut self,
        player_before_move: Vec2,
        ghosts_before_move: &[Vec2],
        germs_before_move: &[Vec2],
    ) {
        let player_pos = self.player.pos;
        let player_cell = player_pos.cell();
        let swapped = |before: Option<&Vec2>, now: Vec2| {
            before.is_some_and(|before| *before == player_cell && now == player_before_move)
        };

        for idx in 0..self.ghosts.len() {
            let ghost = &self.ghosts[idx].view;
            let touching = player_pos.overlaps(ghost.pos)
                || swapped(ghosts_before_move.get(idx), ghost.pos.cell());
            if !touching {
                continue;
            }
            let (mode, by) = (ghost.mode, ghost.id.clone());
            match mode {
                GhostMode::Frightened => self.eat_ghost(idx),
                GhostMode::Eaten => {}
                GhostMode::Scatter | GhostMode::Chase => {
                    self.catch_player(by, false);
                    return;
                }
            }
        }

        for idx in 0..self.germs.len() {
            let germ = &self.germs[idx].view;
            let touching = player_pos.overlaps(germ.pos)
                || swapped(germs_before_move.get(idx), germ.pos.cell());
            if touching {
                let by = germ.id.clone();
                self.catch_player(by, true);
                return;
            }
        }
    }

    pub(super) fn eat_ghost(&mut self, idx: usize) {
        if idx >= self.ghosts.len() {
            return;
        }
        let multiplier = 1u32 << self.ghosts_eaten_in_power.min(16);
        let points = GHOST_EAT_BASE_SCORE
            .saturating_mul(multiplier)
            .min(GHOST_EAT_MAX_SCORE);
        self.ghosts_eaten_in_power += 1;
        self.stats.ghosts_eaten += 1;

        let house = self.maze.ghost_house;
        let ghost = &mut self.ghosts[idx];
        ghost.view.mode = GhostMode::Eaten;
        ghost.view.pos = Position::from_cell(house);
        ghost.view.dir = Direction::None;
        ghost.eaten_timer_ms = EATEN_RECOVERY_MS;
        let ghost_id = ghost.view.id.clone();

        self.add_score(points);
        self.events.push(RuntimeEvent::GhostEaten { ghost_id, points });
    }

    fn catch_player(&mut self, by: String, by_germ: bool) {
        self.lives = self.lives.saturating_sub(1);
        self.stats.deaths += 1;
        if by_germ {
            self.stats.germ_deaths += 1;
        }
        debug!(by = %by, lives = self.lives, tick = self.tick_counter, "player_caught");
        self.events.push(RuntimeEvent::PlayerCaught {
            by,
            lives_left: self.lives,
        });
        if self.lives == 0 {
            self.finish(SessionState::Lost);
        } else {
            self.pending = Some(PendingTransition::Respawn {
                remaining_ms: RESPAWN_DELAY_MS,
            });
        }
    }

    pub(super) fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
        while let Some(threshold) = EXTRA_LIFE_SCORES.get(self.next_extra_life) {
            if self.score < *threshold {
                break;
            }
            self.next_extra_life += 1;
            self.lives += 1;
            self.events.push(RuntimeEvent::ExtraLife { lives: self.lives });
        }
    }

    /// A cleared level supersedes a pending respawn.
    pub(super) fn check_level_cleared(&mut self) {
        if !self.dots.is_empty()
            || matches!(self.pending, Some(PendingTransition::NextLevel { .. }))
        {
            return;
        }
        self.events.push(RuntimeEvent::LevelCleared { level: self.level });
        if self.level >= self.config.max_level {
            self.finish(SessionState::Won);
        } else {
            self.pending = Some(PendingTransition::NextLevel {
                remaining_ms: LEVEL_TRANSITION_MS,
            });
        }
    }

    fn maybe_spawn_fruit(&mut self) {
        let remaining = self.dots.len();
        if !self.config.fruit_enabled
            || self.fruit.is_some()
            || remaining == 0
            || remaining % FRUIT_DOT_INTERVAL != 0
            || self.last_fruit_threshold == Some(remaining)
        {
            return;
        }
        self.last_fruit_threshold = Some(remaining);

        let player_cell = self.player.pos.cell();
        let candidates: Vec<Vec2> = self
            .maze
            .grid
            .traversable_cells()
            .into_iter()
            .filter(|cell| !self.dots.contains_key(cell) && *cell != self.maze.ghost_house)
            .collect();
        let Some(cell) = sample_hazard_cell(
            &candidates,
            player_cell,
            SPAWN_PROTECTION_RADIUS,
            &HashSet::from([player_cell]),
            PLACEMENT_MAX_ATTEMPTS,
            &mut self.rng,
        ) else {
            return;
        };
        let fruit_type = FruitType::ALL[self.rng.pick_index(FruitType::ALL.len())];
        let view = FruitView {
            id: self.make_id("fruit"),
            fruit_type,
            x: cell.x,
            y: cell.y,
            points: get_fruit_points(fruit_type),
            expires_in_ms: FRUIT_LIFETIME_MS,
        };
        self.events.push(RuntimeEvent::FruitSpawned {
            fruit: view.clone(),
        });
        self.fruit = Some(FruitInternal { view, cell });
    }

    pub(super) fn update_fruit(&mut self, dt_ms: u64) {
        let Some(fruit) = self.fruit.as_mut() else {
            return;
        };
        fruit.view.expires_in_ms = fruit.view.expires_in_ms.saturating_sub(dt_ms);
        if fruit.view.expires_in_ms > 0 {
            return;
        }
        let fruit_id = fruit.view.id.clone();
        self.fruit = None;
        self.events.push(RuntimeEvent::FruitExpired { fruit_id });
    }
}
