use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audio::EventListener;
use crate::constants::{
    get_fruit_points, get_germ_move_interval_ms, CHASE_DURATION_MS, DOT_SCORE, EATEN_RECOVERY_MS,
    EXTRA_LIFE_SCORES, FRIGHTENED_DURATION_MS, FRUIT_DOT_INTERVAL, FRUIT_LIFETIME_MS,
    GHOST_EAT_BASE_SCORE, GHOST_EAT_MAX_SCORE, LEVEL_TRANSITION_MS, MAX_LEVEL,
    PLACEMENT_MAX_ATTEMPTS, POWER_DOT_SCORE, RESPAWN_DELAY_MS, SCATTER_DURATION_MS,
    SPAWN_PROTECTION_RADIUS, STARTING_LIVES,
};
use crate::maze::{build_level_maze, to_world_init, MazeError, MazeLayout, MazeOptions};
use crate::placement::{place_entities, sample_hazard_cell, PlacementConfig};
use crate::rng::{RandomSource, Rng};
use crate::types::{
    Direction, DotKind, DotView, FruitType, FruitView, GermView, GhostMode, GhostType, GhostView,
    MazeKind, PlayerView, Position, RuntimeEvent, SessionState, SessionSummary,
    Snapshot, Vec2, WorldInit,
};

mod autopilot;
mod collision_system;
pub mod germ_ai;
pub mod ghost_ai;
mod mode_system;
mod movement_system;
mod spawn_system;
mod utils;

use self::germ_ai::{choose_germ_action, GermAction};
use self::ghost_ai::{choose_ghost_direction, home_corner, AiContext};
use self::utils::{open_moves, random_direction};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} a session that is {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub start_level: u32,
    pub max_level: u32,
    pub seed: u32,
    pub maze_kind: MazeKind,
    pub maze_options: MazeOptions,
    pub starting_lives: u32,
    pub fruit_enabled: bool,
    /// Replaces the per-level placement table when set.
    pub placement: Option<PlacementConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_level: 1,
            max_level: MAX_LEVEL,
            seed: 0,
            maze_kind: MazeKind::Carved,
            maze_options: MazeOptions::default(),
            starting_lives: STARTING_LIVES,
            fruit_enabled: true,
            placement: None,
        }
    }
}

#[derive(Clone, Debug)]
struct GhostInternal {
    view: GhostView,
    spawn: Vec2,
    home: Vec2,
    eaten_timer_ms: u64,
}

#[derive(Clone, Debug)]
struct GermInternal {
    view: GermView,
    spawn: Vec2,
    move_timer_ms: u64,
}

#[derive(Clone, Debug)]
struct FruitInternal {
    view: FruitView,
    cell: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PendingTransition {
    Respawn { remaining_ms: u64 },
    NextLevel { remaining_ms: u64 },
}

#[derive(Clone, Debug, Default)]
struct SessionStats {
    dots_collected: u32,
    ghosts_eaten: u32,
    fruits_eaten: u32,
    deaths: u32,
    germ_deaths: u32,
}

pub struct GameSession {
    pub config: SessionConfig,
    pub maze: MazeLayout,

    state: SessionState,
    rng: Rng,
    level: u32,
    dots: BTreeMap<Vec2, DotKind>,
    player: PlayerView,
    ghosts: Vec<GhostInternal>,
    germs: Vec<GermInternal>,
    fruit: Option<FruitInternal>,
    score: u32,
    lives: u32,
    next_extra_life: usize,

    global_mode: GhostMode,
    mode_timer_ms: u64,
    power_timer_ms: u64,
    ghosts_eaten_in_power: u32,
    last_fruit_threshold: Option<usize>,
    pending: Option<PendingTransition>,

    events: Vec<RuntimeEvent>,
    dispatched_events: usize,
    listeners: Vec<Box<dyn EventListener>>,
    stats: SessionStats,
    elapsed_ms: u64,
    tick_counter: u64,
    next_id_counter: u64,
}

impl GameSession {
    pub fn new(config: SessionConfig) -> Result<Self, MazeError> {
        let max_level = config.max_level.max(1);
        let level = config.start_level.clamp(1, max_level);
        let maze = build_level_maze(config.maze_kind, level, config.seed, &config.maze_options)?;
        let spawn = maze.spawn;
        let lives = config.starting_lives.max(1);
        let rng = Rng::new(config.seed);

        let mut session = Self {
            config: SessionConfig {
                max_level,
                ..config
            },
            maze,
            state: SessionState::NotStarted,
            rng,
            level,
            dots: BTreeMap::new(),
            player: PlayerView {
                pos: Position::from_cell(spawn),
                dir: Direction::None,
                next_dir: Direction::None,
            },
            ghosts: Vec::new(),
            germs: Vec::new(),
            fruit: None,
            score: 0,
            lives,
            next_extra_life: 0,
            global_mode: GhostMode::Scatter,
            mode_timer_ms: SCATTER_DURATION_MS,
            power_timer_ms: 0,
            ghosts_eaten_in_power: 0,
            last_fruit_threshold: None,
            pending: None,
            events: Vec::new(),
            dispatched_events: 0,
            listeners: Vec::new(),
            stats: SessionStats::default(),
            elapsed_ms: 0,
            tick_counter: 0,
            next_id_counter: 1,
        };
        session.populate_level();
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn dots_remaining(&self) -> usize {
        self.dots.len()
    }

    pub fn is_ended(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn get_world_init(&self) -> WorldInit {
        to_world_init(&self.maze)
    }

    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.transition("start", SessionState::NotStarted, SessionState::Playing)?;
        info!(
            level = self.level,
            seed = self.config.seed,
            kind = ?self.config.maze_kind,
            "session_started"
        );
        self.events.push(RuntimeEvent::SessionStarted { level: self.level });
        self.events.push(RuntimeEvent::LevelStarted { level: self.level });
        self.dispatch_events();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.transition("pause", SessionState::Playing, SessionState::Paused)?;
        self.events.push(RuntimeEvent::SessionPaused);
        self.dispatch_events();
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.transition("resume", SessionState::Paused, SessionState::Playing)?;
        self.events.push(RuntimeEvent::SessionResumed);
        self.dispatch_events();
        Ok(())
    }

    /// Queues a turn. Ignored outside `Playing`.
    pub fn set_direction(&mut self, dir: Direction) -> bool {
        if self.state != SessionState::Playing || dir == Direction::None {
            return false;
        }
        self.player.next_dir = dir;
        true
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.state != SessionState::Playing {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        if self.pending.is_some() {
            self.update_pending(dt_ms);
            self.dispatch_events();
            return;
        }

        self.update_power_mode(dt_ms);
        self.update_global_mode(dt_ms);
        self.update_eaten_ghosts(dt_ms);

        let player_before_move = self.player.pos.cell();
        let ghosts_before_move: Vec<Vec2> =
            self.ghosts.iter().map(|ghost| ghost.view.pos.cell()).collect();
        let germs_before_move: Vec<Vec2> =
            self.germs.iter().map(|germ| germ.view.pos.cell()).collect();
        self.update_player();
        self.update_ghosts();
        self.update_germs(dt_ms);
        self.collect_pickups();
        self.resolve_hazard_collisions(player_before_move, &ghosts_before_move, &germs_before_move);

        if self.state == SessionState::Playing {
            self.update_fruit(dt_ms);
            self.check_level_cleared();
        }
        self.dispatch_events();
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let events = if include_events {
            self.drain_events()
        } else {
            Vec::new()
        };
        Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            state: self.state,
            level: self.level,
            score: self.score,
            lives: self.lives,
            global_mode: self.global_mode,
            power_time_left_ms: self.power_timer_ms,
            dots_remaining: self.dots.len(),
            player: self.player.clone(),
            ghosts: self.ghosts.iter().map(|g| g.view.clone()).collect(),
            germs: self.germs.iter().map(|g| g.view.clone()).collect(),
            dots: self
                .dots
                .iter()
                .map(|(cell, kind)| DotView {
                    x: cell.x,
                    y: cell.y,
                    is_power_dot: *kind == DotKind::Power,
                })
                .collect(),
            fruit: self.fruit.as_ref().map(|fruit| fruit.view.clone()),
            events,
        }
    }

    /// Hands out events accumulated since the last drain. Listeners have
    /// already seen them.
    pub fn drain_events(&mut self) -> Vec<RuntimeEvent> {
        self.dispatch_events();
        self.dispatched_events = 0;
        std::mem::take(&mut self.events)
    }

    pub fn build_summary(&self) -> SessionSummary {
        SessionSummary {
            state: self.state,
            score: self.score,
            level_reached: self.level,
            lives_left: self.lives,
            dots_collected: self.stats.dots_collected,
            ghosts_eaten: self.stats.ghosts_eaten,
            fruits_eaten: self.stats.fruits_eaten,
            deaths: self.stats.deaths,
            germ_deaths: self.stats.germ_deaths,
            duration_ms: self.elapsed_ms,
            ticks: self.tick_counter,
        }
    }

    fn transition(
        &mut self,
        action: &'static str,
        from: SessionState,
        to: SessionState,
    ) -> Result<(), SessionError> {
        if self.state != from {
            return Err(SessionError::InvalidTransition {
                action,
                state: self.state,
            });
        }
        self.state = to;
        Ok(())
    }

    fn finish(&mut self, outcome: SessionState) {
        self.state = outcome;
        self.pending = None;
        let event = match outcome {
            SessionState::Won => RuntimeEvent::SessionWon { score: self.score },
            _ => RuntimeEvent::SessionLost { score: self.score },
        };
        self.events.push(event);
        info!(
            outcome = ?outcome,
            score = self.score,
            level = self.level,
            ticks = self.tick_counter,
            "session_finished"
        );
    }

    fn dispatch_events(&mut self) {
        if !self.listeners.is_empty() {
            for event in &self.events[self.dispatched_events..] {
                for listener in self.listeners.iter_mut() {
                    listener.on_event(event);
                }
            }
        }
        self.dispatched_events = self.events.len();
    }

    fn make_id(&mut self, prefix: &str) -> String {
        let id = format!("{}_{}", prefix, self.next_id_counter);
        self.next_id_counter = self.next_id_counter.saturating_add(1);
        id
    }
}
