use super::*;

impl GameSession {
    pub(super) fn activate_power_mode(&mut self) {
        self.power_timer_ms = FRIGHTENED_DURATION_MS;
        self.ghosts_eaten_in_power = 0;
        for ghost in self.ghosts.iter_mut() {
            if ghost.view.mode != GhostMode::Eaten {
                ghost.view.mode = GhostMode::Frightened;
            }
        }
        self.events.push(RuntimeEvent::PowerModeStarted {
            duration_ms: FRIGHTENED_DURATION_MS,
        });
    }

    pub(super) fn update_power_mode(&mut self, dt_ms: u64) {
        if self.power_timer_ms == 0 {
            return;
        }
        self.power_timer_ms = self.power_timer_ms.saturating_sub(dt_ms);
        if self.power_timer_ms > 0 {
            return;
        }
        let global_mode = self.global_mode;
        for ghost in self.ghosts.iter_mut() {
            if ghost.view.mode == GhostMode::Frightened {
                ghost.view.mode = global_mode;
            }
        }
        self.ghosts_eaten_in_power = 0;
        self.events.push(RuntimeEvent::PowerModeEnded);
    }

    /// Scatter/Chase alternation. The timer does not run while power mode is
    /// active.
    pub(super) fn update_global_mode(&mut self, dt_ms: u64) {
        if self.power_timer_ms > 0 {
            return;
        }
        self.mode_timer_ms = self.mode_timer_ms.saturating_sub(dt_ms);
        if self.mode_timer_ms > 0 {
            return;
        }
        let (next, duration) = match self.global_mode {
            GhostMode::Chase => (GhostMode::Scatter, SCATTER_DURATION_MS),
            _ => (GhostMode::Chase, CHASE_DURATION_MS),
        };
        self.global_mode = next;
        self.mode_timer_ms = duration;
        for ghost in self.ghosts.iter_mut() {
            if matches!(ghost.view.mode, GhostMode::Scatter | GhostMode::Chase) {
                ghost.view.mode = next;
            }
        }
        debug!(mode = ?next, tick = self.tick_counter, "global_mode_changed");
        self.events.push(RuntimeEvent::GlobalModeChanged { mode: next });
    }

    pub(super) fn update_eaten_ghosts(&mut self, dt_ms: u64) {
        let house = self.maze.ghost_house;
        for ghost in self.ghosts.iter_mut() {
            if ghost.view.mode != GhostMode::Eaten {
                continue;
            }
            ghost.eaten_timer_ms = ghost.eaten_timer_ms.saturating_sub(dt_ms);
            if ghost.eaten_timer_ms > 0 || ghost.view.pos.cell() != house {
                continue;
            }
            ghost.view.mode = GhostMode::Scatter;
            ghost.view.dir = Direction::None;
            self.events.push(RuntimeEvent::GhostRecovered {
                ghost_id: ghost.view.id.clone(),
            });
        }
    }
}
