use crate::constants::{MAX_LEVEL, STARTING_LIVES};
use crate::types::MazeKind;

pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(16).collect()
}

/// Stable ids are 1..=64 chars of `[A-Za-z0-9_-]` after trimming.
pub fn sanitize_player_id(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > 64 {
        return None;
    }
    if !trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return None;
    }
    Some(trimmed.to_string())
}

pub fn normalize_level(value: Option<i64>, max_level: u32) -> u32 {
    let max_level = max_level.clamp(1, MAX_LEVEL) as i64;
    value.unwrap_or(1).clamp(1, max_level) as u32
}

pub fn normalize_seed(value: Option<i64>) -> Option<u32> {
    value.map(|seed| seed.clamp(0, u32::MAX as i64) as u32)
}

pub fn normalize_lives(value: Option<i64>) -> u32 {
    value.map_or(STARTING_LIVES, |lives| lives.clamp(1, 9) as u32)
}

pub fn normalize_maze_kind(raw: Option<&str>) -> Option<MazeKind> {
    match raw {
        None => Some(MazeKind::Carved),
        Some(value) => MazeKind::parse(&value.trim().to_ascii_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_name_applies_trim_empty_and_max_len() {
        assert_eq!(sanitize_name(""), "Player");
        assert_eq!(sanitize_name("   "), "Player");
        assert_eq!(sanitize_name(" Alice "), "Alice");
        assert_eq!(sanitize_name("12345678901234567890"), "1234567890123456");
    }

    #[test]
    fn player_id_rejects_blank_long_and_odd_characters() {
        assert_eq!(sanitize_player_id(" p-1_a "), Some("p-1_a".to_string()));
        assert_eq!(sanitize_player_id("   "), None);
        assert_eq!(sanitize_player_id("a/b"), None);
        assert_eq!(sanitize_player_id(&"x".repeat(65)), None);
    }

    #[test]
    fn level_and_lives_are_clamped() {
        assert_eq!(normalize_level(None, 10), 1);
        assert_eq!(normalize_level(Some(-3), 10), 1);
        assert_eq!(normalize_level(Some(7), 5), 5);
        assert_eq!(normalize_level(Some(3), 0), 1);
        assert_eq!(normalize_lives(None), STARTING_LIVES);
        assert_eq!(normalize_lives(Some(0)), 1);
        assert_eq!(normalize_lives(Some(99)), 9);
    }

    #[test]
    fn seed_is_clamped_into_u32() {
        assert_eq!(normalize_seed(None), None);
        assert_eq!(normalize_seed(Some(-1)), Some(0));
        assert_eq!(normalize_seed(Some(42)), Some(42));
        assert_eq!(normalize_seed(Some(i64::MAX)), Some(u32::MAX));
    }

    #[test]
    fn maze_kind_defaults_to_carved() {
        assert_eq!(normalize_maze_kind(None), Some(MazeKind::Carved));
        assert_eq!(normalize_maze_kind(Some(" Classic ")), Some(MazeKind::Classic));
        assert_eq!(normalize_maze_kind(Some("spiral")), None);
    }
}
