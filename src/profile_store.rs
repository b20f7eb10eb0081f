use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{is_known_character, DEFAULT_CHARACTER};
use crate::server_utils::{sanitize_name, sanitize_player_id};
use crate::types::{SessionState, SessionSummary};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    #[serde(rename = "highScore", alias = "high_score", default)]
    pub high_score: u32,
    #[serde(default)]
    pub characters: BTreeSet<String>,
    #[serde(rename = "winCount", alias = "wins", default)]
    pub win_count: u32,
    #[serde(rename = "highestLevelReached", alias = "highest_level", default)]
    pub highest_level_reached: u32,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileStoreError {
    #[error("no profile for player '{0}'")]
    NotFound(String),
    #[error("invalid player id '{0}'")]
    InvalidPlayerId(String),
    #[error("unknown character '{0}'")]
    UnknownCharacter(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ProfileStoreFile {
    version: u8,
    players: HashMap<String, PlayerProfile>,
}

#[derive(Clone, Debug, Deserialize)]
struct ProfileStoreFileRaw {
    version: u8,
    players: HashMap<String, serde_json::Value>,
}

/// Player profiles keyed by stable player id, persisted as one JSON file.
/// Disk problems are logged and never surface to callers.
pub struct ProfileStore {
    file_path: PathBuf,
    players: HashMap<String, PlayerProfile>,
}

impl ProfileStore {
    pub fn new(file_path: PathBuf) -> Self {
        let players = load_players(&file_path);
        Self { file_path, players }
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerProfile> {
        let key = sanitize_player_id(player_id)?;
        self.players.get(&key)
    }

    pub fn create_or_fetch(
        &mut self,
        player_id: &str,
        name: &str,
    ) -> Result<PlayerProfile, ProfileStoreError> {
        let key = profile_key(player_id)?;
        if let Some(existing) = self.players.get(&key) {
            return Ok(existing.clone());
        }
        let profile = PlayerProfile {
            name: sanitize_name(name),
            high_score: 0,
            characters: BTreeSet::from([DEFAULT_CHARACTER.to_string()]),
            win_count: 0,
            highest_level_reached: 0,
            updated_at: now_iso(),
        };
        debug!(player_id = %key, name = %profile.name, "profile_created");
        self.players.insert(key, profile.clone());
        self.save();
        Ok(profile)
    }

    /// Returns whether the character was newly unlocked.
    pub fn add_character(
        &mut self,
        player_id: &str,
        character: &str,
    ) -> Result<bool, ProfileStoreError> {
        let character = character.trim();
        if !is_known_character(character) {
            return Err(ProfileStoreError::UnknownCharacter(character.to_string()));
        }
        let profile = self.profile_mut(player_id)?;
        let added = profile.characters.insert(character.to_string());
        if added {
            profile.updated_at = now_iso();
            self.save();
        }
        Ok(added)
    }

    pub fn increment_wins(&mut self, player_id: &str) -> Result<u32, ProfileStoreError> {
        let profile = self.profile_mut(player_id)?;
        profile.win_count = profile.win_count.saturating_add(1);
        profile.updated_at = now_iso();
        let wins = profile.win_count;
        self.save();
        Ok(wins)
    }

    /// Raises the stored high score and level; never lowers either.
    pub fn raise_progress(
        &mut self,
        player_id: &str,
        score: u32,
        level: u32,
    ) -> Result<bool, ProfileStoreError> {
        let profile = self.profile_mut(player_id)?;
        let changed = apply_progress(profile, score, level);
        if changed {
            self.save();
        }
        Ok(changed)
    }

    pub fn record_session(
        &mut self,
        player_id: &str,
        summary: &SessionSummary,
    ) -> Result<PlayerProfile, ProfileStoreError> {
        let profile = self.profile_mut(player_id)?;
        apply_progress(profile, summary.score, summary.level_reached);
        if summary.state == SessionState::Won {
            profile.win_count = profile.win_count.saturating_add(1);
        }
        profile.updated_at = now_iso();
        let snapshot = profile.clone();
        self.save();
        Ok(snapshot)
    }

    fn profile_mut(&mut self, player_id: &str) -> Result<&mut PlayerProfile, ProfileStoreError> {
        let key = profile_key(player_id)?;
        self.players
            .get_mut(&key)
            .ok_or(ProfileStoreError::NotFound(key))
    }

    fn save(&self) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), %error, "profile_store_mkdir_failed");
                return;
            }
        }

        let payload = ProfileStoreFile {
            version: 1,
            players: self.players.clone(),
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    warn!(path = %self.file_path.display(), %error, "profile_store_write_failed");
                }
            }
            Err(error) => {
                warn!(path = %self.file_path.display(), %error, "profile_store_serialize_failed");
            }
        }
    }
}

fn apply_progress(profile: &mut PlayerProfile, score: u32, level: u32) -> bool {
    let mut changed = false;
    if score > profile.high_score {
        profile.high_score = score;
        changed = true;
    }
    if level > profile.highest_level_reached {
        profile.highest_level_reached = level;
        changed = true;
    }
    if changed {
        profile.updated_at = now_iso();
    }
    changed
}

fn profile_key(player_id: &str) -> Result<String, ProfileStoreError> {
    sanitize_player_id(player_id)
        .ok_or_else(|| ProfileStoreError::InvalidPlayerId(player_id.to_string()))
}

fn load_players(path: &Path) -> HashMap<String, PlayerProfile> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "profile_store_read_failed");
            }
            return HashMap::new();
        }
    };
    let parsed = match serde_json::from_str::<ProfileStoreFileRaw>(&text) {
        Ok(value) if value.version == 1 => value,
        Ok(value) => {
            warn!(path = %path.display(), version = value.version, "profile_store_unsupported_version");
            return HashMap::new();
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "profile_store_parse_failed");
            return HashMap::new();
        }
    };

    let mut sanitized = HashMap::new();
    for (player_id, raw_value) in parsed.players {
        let Some(key) = sanitize_player_id(&player_id) else {
            warn!(player_id = %player_id, "profile_store_invalid_key");
            continue;
        };
        let profile: PlayerProfile = match serde_json::from_value(raw_value) {
            Ok(profile) => profile,
            Err(error) => {
                warn!(player_id = %player_id, %error, "profile_store_entry_skipped");
                continue;
            }
        };
        let Some(profile) = sanitize_profile(profile) else {
            continue;
        };
        sanitized.insert(key, profile);
    }
    sanitized
}

fn sanitize_profile(profile: PlayerProfile) -> Option<PlayerProfile> {
    if profile.name.trim().is_empty() {
        return None;
    }
    let name = sanitize_name(&profile.name);
    let mut characters: BTreeSet<String> = profile
        .characters
        .into_iter()
        .map(|character| character.trim().to_string())
        .filter(|character| is_known_character(character))
        .collect();
    if characters.is_empty() {
        characters.insert(DEFAULT_CHARACTER.to_string());
    }
    Some(PlayerProfile {
        name,
        characters,
        ..profile
    })
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            Utc::now()
                .timestamp_millis()
                .unsigned_abs()
                .saturating_add(rand::random::<u32>() as u64)
        );
        std::env::temp_dir().join(unique).join("profiles.json")
    }

    fn summary(state: SessionState, score: u32, level_reached: u32) -> SessionSummary {
        SessionSummary {
            state,
            score,
            level_reached,
            lives_left: 0,
            dots_collected: 0,
            ghosts_eaten: 0,
            fruits_eaten: 0,
            deaths: 0,
            germ_deaths: 0,
            duration_ms: 0,
            ticks: 0,
        }
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_file(path);
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn create_or_fetch_is_idempotent_and_persists() {
        let path = temp_file("profile-store-create");
        let mut store = ProfileStore::new(path.clone());
        let created = store.create_or_fetch("player-1", " Alice ").expect("create");
        assert_eq!(created.name, "Alice");
        assert!(created.characters.contains(DEFAULT_CHARACTER));

        let fetched = store.create_or_fetch("player-1", "Renamed").expect("fetch");
        assert_eq!(fetched.name, "Alice");

        let reloaded = ProfileStore::new(path.clone());
        assert_eq!(reloaded.get("player-1").map(|p| p.name.as_str()), Some("Alice"));
        cleanup(&path);
    }

    #[test]
    fn missing_player_is_not_found() {
        let path = temp_file("profile-store-missing");
        let mut store = ProfileStore::new(path.clone());
        assert_eq!(
            store.increment_wins("ghost"),
            Err(ProfileStoreError::NotFound("ghost".to_string()))
        );
        assert!(matches!(
            store.create_or_fetch("  ", "Bob"),
            Err(ProfileStoreError::InvalidPlayerId(_))
        ));
        cleanup(&path);
    }

    #[test]
    fn characters_have_set_semantics_and_must_be_known() {
        let path = temp_file("profile-store-characters");
        let mut store = ProfileStore::new(path.clone());
        store.create_or_fetch("p1", "Alice").expect("create");
        assert_eq!(store.add_character("p1", "Wolffy"), Ok(true));
        assert_eq!(store.add_character("p1", "Wolffy"), Ok(false));
        assert_eq!(
            store.add_character("p1", "Pikachu"),
            Err(ProfileStoreError::UnknownCharacter("Pikachu".to_string()))
        );
        let profile = store.get("p1").expect("profile");
        assert_eq!(profile.characters.len(), 2);
        cleanup(&path);
    }

    #[test]
    fn progress_only_moves_upward() {
        let path = temp_file("profile-store-progress");
        let mut store = ProfileStore::new(path.clone());
        store.create_or_fetch("p1", "Alice").expect("create");
        assert_eq!(store.raise_progress("p1", 1_200, 3), Ok(true));
        assert_eq!(store.raise_progress("p1", 800, 2), Ok(false));
        assert_eq!(store.raise_progress("p1", 800, 4), Ok(true));
        let profile = store.get("p1").expect("profile");
        assert_eq!(profile.high_score, 1_200);
        assert_eq!(profile.highest_level_reached, 4);
        cleanup(&path);
    }

    #[test]
    fn record_session_counts_wins_only_for_won_sessions() {
        let path = temp_file("profile-store-record");
        let mut store = ProfileStore::new(path.clone());
        store.create_or_fetch("p1", "Alice").expect("create");
        store
            .record_session("p1", &summary(SessionState::Lost, 500, 2))
            .expect("record lost");
        let profile = store
            .record_session("p1", &summary(SessionState::Won, 300, 10))
            .expect("record won");
        assert_eq!(profile.win_count, 1);
        assert_eq!(profile.high_score, 500);
        assert_eq!(profile.highest_level_reached, 10);
        cleanup(&path);
    }

    #[test]
    fn load_keeps_valid_entries_and_drops_unknown_characters() {
        let path = temp_file("profile-store-load");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = r#"{
  "version": 1,
  "players": {
    "p1": {
      "name": " Alice ",
      "highScore": 900,
      "characters": ["Weslie", "Nobody", "Tibbie"],
      "winCount": 2,
      "highestLevelReached": 5,
      "updatedAt": "2026-01-01T00:00:00.000Z"
    },
    "p2": {
      "name": "Broken",
      "highScore": -5
    },
    "p3": {
      "name": "   "
    }
  }
}"#;
        fs::write(&path, raw).expect("write file");

        let store = ProfileStore::new(path.clone());
        let alice = store.get("p1").expect("alice loads");
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.high_score, 900);
        assert_eq!(alice.characters.len(), 2);
        assert!(!alice.characters.contains("Nobody"));
        assert!(store.get("p2").is_none());
        assert!(store.get("p3").is_none());
        cleanup(&path);
    }

    #[test]
    fn unreadable_file_starts_empty() {
        let path = temp_file("profile-store-garbage");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        fs::write(&path, "{not json").expect("write file");
        let store = ProfileStore::new(path.clone());
        assert!(store.get("p1").is_none());

        fs::write(&path, r#"{"version":2,"players":{}}"#).expect("write file");
        let store = ProfileStore::new(path.clone());
        assert!(store.get("p1").is_none());
        cleanup(&path);
    }
}
