use crate::types::{FruitType, GermTrait};

pub const TICK_MS: u64 = 150;

pub const STARTING_LIVES: u32 = 3;
pub const MAX_LEVEL: u32 = 10;
pub const EXTRA_LIFE_SCORES: [u32; 3] = [10_000, 15_000, 20_000];

pub const DOT_SCORE: u32 = 10;
pub const POWER_DOT_SCORE: u32 = 50;
pub const GHOST_EAT_BASE_SCORE: u32 = 200;
pub const GHOST_EAT_MAX_SCORE: u32 = 1_600;

pub const SCATTER_DURATION_MS: u64 = 7_000;
pub const CHASE_DURATION_MS: u64 = 20_000;
pub const FRIGHTENED_DURATION_MS: u64 = 7_000;
pub const EATEN_RECOVERY_MS: u64 = 3_000;
pub const RESPAWN_DELAY_MS: u64 = 1_000;
pub const LEVEL_TRANSITION_MS: u64 = 2_000;

pub const COLLISION_EPSILON: f32 = 0.5;

pub const SPAWN_PROTECTION_RADIUS: i32 = 2;
pub const PLACEMENT_MAX_ATTEMPTS: usize = 100;
pub const MAZE_MAX_ATTEMPTS: u32 = 5;
pub const GHOST_COUNT: usize = 4;

pub const AMBUSH_LOOKAHEAD: i32 = 4;
pub const PATTERN_LOOKAHEAD: i32 = 2;
pub const SWITCH_FLEE_RADIUS: f32 = 8.0;

pub const GERM_MOVE_INTERVAL_MS: u64 = 800;
pub const FAST_GERM_MOVE_INTERVAL_MS: u64 = 400;
pub const SLOW_GERM_MOVE_INTERVAL_MS: u64 = 1_200;
pub const TELEPORT_CHANCE: f32 = 0.05;
pub const SMART_HUNTER_RADIUS: f32 = 10.0;

pub const FRUIT_DOT_INTERVAL: usize = 70;
pub const FRUIT_LIFETIME_MS: u64 = 10_000;

pub const CHARACTERS: [&str; 8] = [
    "Weslie", "Wolnie", "Wolffy", "Wilie", "Tibbie", "Sparky", "Paddi", "Jonie",
];
pub const DEFAULT_CHARACTER: &str = "Weslie";

pub fn get_germ_count(level: u32) -> usize {
    let level = level.clamp(1, MAX_LEVEL);
    5 + level as usize * 5
}

pub fn get_germ_move_interval_ms(germ_trait: GermTrait) -> u64 {
    match germ_trait {
        GermTrait::Fast => FAST_GERM_MOVE_INTERVAL_MS,
        GermTrait::Slow => SLOW_GERM_MOVE_INTERVAL_MS,
        _ => GERM_MOVE_INTERVAL_MS,
    }
}

/// Chance that a germ re-rolls its heading on an evaluation.
pub fn get_germ_turn_chance(germ_trait: GermTrait) -> f32 {
    match germ_trait {
        GermTrait::Patrol | GermTrait::Fast | GermTrait::Slow => 0.3,
        GermTrait::Hunter => 0.6,
        GermTrait::Guard => 0.2,
        GermTrait::Teleporter | GermTrait::SmartHunter => 0.4,
    }
}

pub fn get_fruit_points(fruit_type: FruitType) -> u32 {
    match fruit_type {
        FruitType::Cherry => 100,
        FruitType::Strawberry => 300,
        FruitType::Orange => 500,
        FruitType::Apple => 700,
        FruitType::Melon => 1_000,
        FruitType::Galaxian => 2_000,
        FruitType::Key => 5_000,
    }
}

pub fn is_known_character(name: &str) -> bool {
    CHARACTERS.iter().any(|character| *character == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn germ_count_follows_level_table() {
        assert_eq!(get_germ_count(1), 10);
        assert_eq!(get_germ_count(2), 15);
        assert_eq!(get_germ_count(10), 55);
        assert_eq!(get_germ_count(0), 10);
        assert_eq!(get_germ_count(99), 55);
    }

    #[test]
    fn fast_and_slow_germs_change_only_cadence() {
        assert!(get_germ_move_interval_ms(GermTrait::Fast) < GERM_MOVE_INTERVAL_MS);
        assert!(get_germ_move_interval_ms(GermTrait::Slow) > GERM_MOVE_INTERVAL_MS);
        assert_eq!(
            get_germ_turn_chance(GermTrait::Fast),
            get_germ_turn_chance(GermTrait::Patrol)
        );
    }
}
