use serde::Serialize;

use crate::constants::COLLISION_EPSILON;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Probe order for every neighbour scan.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dir: Direction, steps: i32) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx * steps,
            y: self.y + dy * steps,
        }
    }
}

/// Entity position. Movement keeps it on integer cells; the floor is authoritative
/// and collisions compare with an epsilon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn from_cell(cell: Vec2) -> Self {
        Self {
            x: cell.x as f32,
            y: cell.y as f32,
        }
    }

    pub fn cell(self) -> Vec2 {
        Vec2 {
            x: self.x.floor() as i32,
            y: self.y.floor() as i32,
        }
    }

    pub fn overlaps(self, other: Position) -> bool {
        (self.x - other.x).abs() < COLLISION_EPSILON && (self.y - other.y).abs() < COLLISION_EPSILON
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MazeKind {
    Carved,
    Scattered,
    Classic,
}

impl MazeKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "carved" => Some(Self::Carved),
            "scattered" => Some(Self::Scattered),
            "classic" => Some(Self::Classic),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostMode {
    Scatter,
    Chase,
    Frightened,
    Eaten,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostType {
    Direct,
    Ambush,
    Pattern,
    Switch,
}

impl GhostType {
    pub const ALL: [GhostType; 4] = [
        GhostType::Direct,
        GhostType::Ambush,
        GhostType::Pattern,
        GhostType::Switch,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GermTrait {
    Patrol,
    Hunter,
    Guard,
    Fast,
    Slow,
    Teleporter,
    SmartHunter,
}

impl GermTrait {
    pub const ALL: [GermTrait; 7] = [
        GermTrait::Patrol,
        GermTrait::Hunter,
        GermTrait::Guard,
        GermTrait::Fast,
        GermTrait::Slow,
        GermTrait::Teleporter,
        GermTrait::SmartHunter,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FruitType {
    Cherry,
    Strawberry,
    Orange,
    Apple,
    Melon,
    Galaxian,
    Key,
}

impl FruitType {
    pub const ALL: [FruitType; 7] = [
        FruitType::Cherry,
        FruitType::Strawberry,
        FruitType::Orange,
        FruitType::Apple,
        FruitType::Melon,
        FruitType::Galaxian,
        FruitType::Key,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Playing,
    Paused,
    Won,
    Lost,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DotKind {
    Normal,
    Power,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    #[serde(flatten)]
    pub pos: Position,
    pub dir: Direction,
    #[serde(rename = "nextDir")]
    pub next_dir: Direction,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub id: String,
    #[serde(flatten)]
    pub pos: Position,
    pub dir: Direction,
    #[serde(rename = "type")]
    pub ghost_type: GhostType,
    pub mode: GhostMode,
}

#[derive(Clone, Debug, Serialize)]
pub struct GermView {
    pub id: String,
    #[serde(flatten)]
    pub pos: Position,
    pub dir: Direction,
    #[serde(rename = "trait")]
    pub germ_trait: GermTrait,
}

#[derive(Clone, Debug, Serialize)]
pub struct DotView {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "isPowerDot")]
    pub is_power_dot: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct FruitView {
    pub id: String,
    #[serde(rename = "type")]
    pub fruit_type: FruitType,
    pub x: i32,
    pub y: i32,
    pub points: u32,
    #[serde(rename = "expiresInMs")]
    pub expires_in_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct WorldInit {
    pub width: i32,
    pub height: i32,
    pub kind: MazeKind,
    pub level: u32,
    pub tunnels: bool,
    pub tiles: Vec<String>,
    pub spawn: Vec2,
    #[serde(rename = "ghostHouse")]
    pub ghost_house: Vec2,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    SessionStarted {
        level: u32,
    },
    SessionPaused,
    SessionResumed,
    LevelStarted {
        level: u32,
    },
    DotCollected {
        x: i32,
        y: i32,
        power: bool,
    },
    PowerModeStarted {
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    PowerModeEnded,
    GlobalModeChanged {
        mode: GhostMode,
    },
    GhostEaten {
        #[serde(rename = "ghostId")]
        ghost_id: String,
        points: u32,
    },
    GhostRecovered {
        #[serde(rename = "ghostId")]
        ghost_id: String,
    },
    GermTeleported {
        #[serde(rename = "germId")]
        germ_id: String,
        x: i32,
        y: i32,
    },
    FruitSpawned {
        fruit: FruitView,
    },
    FruitEaten {
        #[serde(rename = "fruitId")]
        fruit_id: String,
        #[serde(rename = "fruitType")]
        fruit_type: FruitType,
        points: u32,
    },
    FruitExpired {
        #[serde(rename = "fruitId")]
        fruit_id: String,
    },
    ExtraLife {
        lives: u32,
    },
    PlayerCaught {
        by: String,
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    PlayerRespawned,
    LevelCleared {
        level: u32,
    },
    SessionWon {
        score: u32,
    },
    SessionLost {
        score: u32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub state: SessionState,
    pub level: u32,
    pub score: u32,
    pub lives: u32,
    #[serde(rename = "globalMode")]
    pub global_mode: GhostMode,
    #[serde(rename = "powerTimeLeftMs")]
    pub power_time_left_ms: u64,
    #[serde(rename = "dotsRemaining")]
    pub dots_remaining: usize,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub germs: Vec<GermView>,
    pub dots: Vec<DotView>,
    pub fruit: Option<FruitView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub state: SessionState,
    pub score: u32,
    #[serde(rename = "levelReached")]
    pub level_reached: u32,
    #[serde(rename = "livesLeft")]
    pub lives_left: u32,
    #[serde(rename = "dotsCollected")]
    pub dots_collected: u32,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: u32,
    #[serde(rename = "fruitsEaten")]
    pub fruits_eaten: u32,
    pub deaths: u32,
    #[serde(rename = "germDeaths")]
    pub germ_deaths: u32,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub ticks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_uses_half_cell_tolerance() {
        let a = Position { x: 3.0, y: 4.0 };
        assert!(a.overlaps(Position { x: 3.4, y: 4.4 }));
        assert!(!a.overlaps(Position { x: 3.5, y: 4.0 }));
        assert!(!a.overlaps(Position { x: 4.0, y: 4.0 }));
    }

    #[test]
    fn cell_floors_fractional_positions() {
        assert_eq!(Position { x: 2.9, y: 0.1 }.cell(), Vec2::new(2, 0));
    }

    #[test]
    fn event_serializes_with_snake_case_tag() {
        let value = serde_json::to_value(RuntimeEvent::GhostEaten {
            ghost_id: "ghost_1".to_string(),
            points: 400,
        })
        .expect("serialize event");
        assert_eq!(value["type"], "ghost_eaten");
        assert_eq!(value["ghostId"], "ghost_1");
    }
}
