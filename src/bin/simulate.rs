use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use pacman_germs::constants::{FRIGHTENED_DURATION_MS, MAX_LEVEL, TICK_MS};
use pacman_germs::engine::{GameSession, SessionConfig};
use pacman_germs::maze::Grid;
use pacman_germs::server_utils::{normalize_lives, normalize_maze_kind};
use pacman_germs::types::{Direction, MazeKind, Position, RuntimeEvent, SessionState, Snapshot};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Number of consecutive seeds to play.
    #[arg(long, default_value_t = 3)]
    runs: u32,
    #[arg(long)]
    seed: Option<u32>,
    /// carved, scattered or classic.
    #[arg(long)]
    maze: Option<String>,
    #[arg(long, default_value_t = 1)]
    level: u32,
    #[arg(long, default_value_t = MAX_LEVEL)]
    max_level: u32,
    #[arg(long)]
    lives: Option<i64>,
    #[arg(long, default_value_t = 40_000)]
    max_ticks: u64,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u32,
    maze: MazeKind,
    #[serde(rename = "startLevel")]
    start_level: u32,
    #[serde(rename = "maxLevel")]
    max_level: u32,
    lives: u32,
    #[serde(rename = "maxTicks")]
    max_ticks: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    maze: MazeKind,
    /// `won`, `lost` or `unfinished` when the tick limit ran out.
    outcome: String,
    score: u32,
    #[serde(rename = "levelReached")]
    level_reached: u32,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    ticks: u64,
    #[serde(rename = "dotsCollected")]
    dots_collected: u32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    #[serde(rename = "fruitsEaten")]
    fruits_eaten: u32,
    deaths: u32,
    #[serde(rename = "germDeaths")]
    germ_deaths: u32,
    #[serde(rename = "germTeleports")]
    germ_teleports: u32,
    #[serde(rename = "levelsCleared")]
    levels_cleared: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

/// Previous-tick values the invariant checks compare against.
#[derive(Clone, Copy, Debug)]
struct Watermark {
    level: u32,
    score: u32,
    lives: u32,
    dots_remaining: usize,
}

impl Watermark {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            level: snapshot.level,
            score: snapshot.score,
            lives: snapshot.lives,
            dots_remaining: snapshot.dots_remaining,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let scenarios = match resolve_scenarios(&cli) {
        Ok(scenarios) => scenarios,
        Err(message) => {
            error!(%message, "invalid_arguments");
            return ExitCode::from(2);
        }
    };
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            maze = ?scenario.maze,
            "scenario_started"
        );
        let scenario_run = match run_scenario(&scenario) {
            Ok(run) => run,
            Err(message) => {
                error!(match_id = %match_id, scenario = %scenario.name, %message, "scenario_setup_failed");
                has_anomaly = true;
                continue;
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            warn!(
                match_id = %match_id,
                scenario = %scenario.name,
                seed = scenario.seed,
                tick = anomaly.tick,
                message = %anomaly.message,
                "anomaly_detected"
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *outcome_counts
            .entry(scenario_run.result.outcome.clone())
            .or_insert(0) += 1;

        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            outcome = %scenario_run.result.outcome,
            score = scenario_run.result.score,
            level = scenario_run.result.level_reached,
            ticks = scenario_run.result.ticks,
            anomaly_count = scenario_run.anomaly_records.len(),
            "scenario_finished"
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => error!(%error, "scenario_result_serialize_failed"),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        now_ms(),
        scenario_results,
        outcome_counts,
        total_anomalies,
    );

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            error!(match_id = %match_id, path = %path.display(), %error, "summary_write_failed");
            return ExitCode::from(2);
        }
    }

    info!(
        match_id = %match_id,
        scenario_count = summary.scenario_count,
        anomaly_count = summary.anomaly_count,
        average_score = summary.average_score,
        "run_finished"
    );

    if has_anomaly {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the result lines.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn run_scenario(scenario: &Scenario) -> Result<ScenarioRunResult, String> {
    let mut session = GameSession::new(SessionConfig {
        start_level: scenario.start_level,
        max_level: scenario.max_level,
        seed: scenario.seed,
        maze_kind: scenario.maze,
        starting_lives: scenario.lives,
        ..SessionConfig::default()
    })
    .map_err(|error| error.to_string())?;
    session.start().map_err(|error| error.to_string())?;

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut germ_teleports = 0;
    let mut levels_cleared = 0;
    let mut previous = Watermark::from_snapshot(&session.build_snapshot(false));

    for _ in 0..scenario.max_ticks {
        if session.is_ended() {
            break;
        }
        let dir = session.autopilot_direction();
        if dir != Direction::None {
            session.set_direction(dir);
        }
        session.step(TICK_MS);
        let snapshot = session.build_snapshot(true);

        let mut messages = collect_snapshot_anomalies(&snapshot, &session.maze.grid);
        messages.extend(collect_progress_anomalies(&previous, &snapshot));
        for message in messages {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        for event in &snapshot.events {
            match event {
                RuntimeEvent::GermTeleported { .. } => germ_teleports += 1,
                RuntimeEvent::LevelCleared { .. } => levels_cleared += 1,
                _ => {}
            }
        }
        previous = Watermark::from_snapshot(&snapshot);
    }

    let summary = session.build_summary();
    let outcome = match summary.state {
        SessionState::Won => "won",
        SessionState::Lost => "lost",
        _ => "unfinished",
    };

    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            maze: scenario.maze,
            outcome: outcome.to_string(),
            score: summary.score,
            level_reached: summary.level_reached,
            duration_ms: summary.duration_ms,
            ticks: summary.ticks,
            dots_collected: summary.dots_collected,
            ghosts_eaten: summary.ghosts_eaten,
            fruits_eaten: summary.fruits_eaten,
            deaths: summary.deaths,
            germ_deaths: summary.germ_deaths,
            germ_teleports,
            levels_cleared,
            anomalies,
        },
        anomaly_records,
    })
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, grid: &Grid) -> Vec<String> {
    let mut anomalies = Vec::new();
    if !on_floor(grid, snapshot.player.pos) {
        anomalies.push(format!(
            "player inside wall at ({}, {})",
            snapshot.player.pos.x, snapshot.player.pos.y
        ));
    }
    for ghost in &snapshot.ghosts {
        if !on_floor(grid, ghost.pos) {
            anomalies.push(format!("ghost inside wall: {}", ghost.id));
        }
    }
    for germ in &snapshot.germs {
        if !on_floor(grid, germ.pos) {
            anomalies.push(format!("germ inside wall: {}", germ.id));
        }
    }
    if snapshot.power_time_left_ms > FRIGHTENED_DURATION_MS {
        anomalies.push(format!(
            "power timer above duration: {}",
            snapshot.power_time_left_ms
        ));
    }
    anomalies
}

fn collect_progress_anomalies(previous: &Watermark, snapshot: &Snapshot) -> Vec<String> {
    let mut anomalies = Vec::new();
    if snapshot.score < previous.score {
        anomalies.push(format!(
            "score decreased: {} -> {}",
            previous.score, snapshot.score
        ));
    }
    if snapshot.level == previous.level && snapshot.dots_remaining > previous.dots_remaining {
        anomalies.push(format!(
            "dots reappeared within level {}",
            snapshot.level
        ));
    }
    if snapshot.level < previous.level {
        anomalies.push(format!(
            "level went backwards: {} -> {}",
            previous.level, snapshot.level
        ));
    }
    let extra_lives = snapshot
        .events
        .iter()
        .filter(|event| matches!(event, RuntimeEvent::ExtraLife { .. }))
        .count() as u32;
    if snapshot.lives > previous.lives + extra_lives {
        anomalies.push(format!(
            "lives increased without extra life: {} -> {}",
            previous.lives, snapshot.lives
        ));
    }
    anomalies
}

fn on_floor(grid: &Grid, pos: Position) -> bool {
    let cell = pos.cell();
    grid.is_walkable(cell.x, cell.y)
}

fn resolve_scenarios(cli: &Cli) -> Result<Vec<Scenario>, String> {
    let seed = cli.seed.unwrap_or_else(|| now_ms() as u32);
    let maze = normalize_maze_kind(cli.maze.as_deref())
        .ok_or_else(|| format!("unknown maze kind: {}", cli.maze.as_deref().unwrap_or("")))?;
    let max_level = cli.max_level.clamp(1, MAX_LEVEL);
    let start_level = cli.level.clamp(1, max_level);
    let lives = normalize_lives(cli.lives);

    Ok((0..cli.runs.max(1))
        .map(|index| {
            let seed = seed.wrapping_add(index);
            Scenario {
                name: format!("{}-l{start_level}-s{seed}", maze_label(maze)),
                seed,
                maze,
                start_level,
                max_level,
                lives,
                max_ticks: cli.max_ticks.max(1),
            }
        })
        .collect())
}

fn maze_label(kind: MazeKind) -> &'static str {
    match kind {
        MazeKind::Carved => "carved",
        MazeKind::Scattered => "scattered",
        MazeKind::Classic => "classic",
    }
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_score: u64 = scenarios.iter().map(|line| line.score as u64).sum();
    let average_score = if scenario_count == 0 {
        0
    } else {
        (total_score / scenario_count as u64) as u32
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_score,
        outcome_counts,
        scenarios,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_scenario_result(outcome: &str, score: u32) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            maze: MazeKind::Classic,
            outcome: outcome.to_string(),
            score,
            level_reached: 1,
            duration_ms: 0,
            ticks: 0,
            dots_collected: 0,
            ghosts_eaten: 0,
            fruits_eaten: 0,
            deaths: 0,
            germ_deaths: 0,
            germ_teleports: 0,
            levels_cleared: 0,
            anomalies: Vec::new(),
        }
    }

    fn watermark(level: u32, score: u32, lives: u32, dots_remaining: usize) -> Watermark {
        Watermark {
            level,
            score,
            lives,
            dots_remaining,
        }
    }

    fn classic_snapshot() -> Snapshot {
        let mut session = GameSession::new(SessionConfig {
            maze_kind: MazeKind::Classic,
            seed: 5,
            ..SessionConfig::default()
        })
        .expect("maze builds");
        session.start().expect("start");
        session.build_snapshot(false)
    }

    #[test]
    fn default_match_id_contains_seed_and_timestamp() {
        assert_eq!(default_match_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_score() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![
                make_scenario_result("lost", 1_000),
                make_scenario_result("won", 3_000),
            ],
            BTreeMap::from([("lost".to_string(), 1usize), ("won".to_string(), 1usize)]),
            0,
        );
        assert_eq!(summary.average_score, 2_000);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let path = std::env::temp_dir()
            .join(format!("pacman-germs-missing-{}", now_ms()))
            .join("summary.json");
        let summary = build_run_summary("id".to_string(), 0, 0, Vec::new(), BTreeMap::new(), 0);
        assert!(write_summary(&path, &summary).is_err());
    }

    #[test]
    fn progress_checks_flag_regressions() {
        let mut snapshot = classic_snapshot();
        let before = watermark(snapshot.level, snapshot.score + 10, snapshot.lives, 0);
        let messages = collect_progress_anomalies(&before, &snapshot);
        assert!(messages.iter().any(|m| m.starts_with("score decreased")));
        assert!(messages.iter().any(|m| m.starts_with("dots reappeared")));

        snapshot.lives += 1;
        let before = Watermark::from_snapshot(&classic_snapshot());
        let messages = collect_progress_anomalies(&before, &snapshot);
        assert!(messages
            .iter()
            .any(|m| m.starts_with("lives increased without extra life")));

        snapshot.events.push(RuntimeEvent::ExtraLife { lives: snapshot.lives });
        assert!(collect_progress_anomalies(&before, &snapshot).is_empty());
    }

    #[test]
    fn snapshot_checks_flag_entities_in_walls() {
        let session = GameSession::new(SessionConfig {
            maze_kind: MazeKind::Classic,
            ..SessionConfig::default()
        })
        .expect("maze builds");
        let mut snapshot = classic_snapshot();
        assert!(collect_snapshot_anomalies(&snapshot, &session.maze.grid).is_empty());

        snapshot.player.pos = Position { x: 0.0, y: 0.0 };
        let messages = collect_snapshot_anomalies(&snapshot, &session.maze.grid);
        assert!(messages.iter().any(|m| m.starts_with("player inside wall")));
    }

    #[test]
    fn short_classic_run_reports_no_anomalies() {
        let scenario = Scenario {
            name: "classic-smoke".to_string(),
            seed: 11,
            maze: MazeKind::Classic,
            start_level: 1,
            max_level: MAX_LEVEL,
            lives: 3,
            max_ticks: 600,
        };
        let run = run_scenario(&scenario).expect("scenario runs");
        assert!(
            run.result.anomalies.is_empty(),
            "unexpected anomalies: {:?}",
            run.result.anomalies
        );
        assert!(run.result.dots_collected > 0);
    }
}
