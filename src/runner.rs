use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::constants::TICK_MS;
use crate::engine::{GameSession, SessionError};
use crate::types::{Direction, Snapshot};

/// Drives one session from a tokio interval and publishes a snapshot after
/// every tick. Only one tick task exists at a time.
pub struct SessionRunner {
    session: Arc<Mutex<GameSession>>,
    snapshots: watch::Sender<Option<Snapshot>>,
    tick_ms: u64,
    task: Option<JoinHandle<()>>,
}

impl SessionRunner {
    pub fn new(session: GameSession) -> Self {
        Self::with_tick_ms(session, TICK_MS)
    }

    pub fn with_tick_ms(session: GameSession, tick_ms: u64) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            session: Arc::new(Mutex::new(session)),
            snapshots,
            tick_ms: tick_ms.max(1),
            task: None,
        }
    }

    pub fn session(&self) -> Arc<Mutex<GameSession>> {
        self.session.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Snapshot>> {
        self.snapshots.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub async fn start(&mut self) -> Result<(), SessionError> {
        let snapshot = {
            let mut session = self.session.lock().await;
            session.start()?;
            session.build_snapshot(true)
        };
        self.snapshots.send_replace(Some(snapshot));
        self.spawn_loop();
        Ok(())
    }

    /// Stops the tick task before returning; no step runs after this.
    pub async fn pause(&mut self) -> Result<(), SessionError> {
        let shared = self.session.clone();
        let mut session = shared.lock().await;
        session.pause()?;
        self.abort_loop();
        let snapshot = session.build_snapshot(true);
        drop(session);
        self.snapshots.send_replace(Some(snapshot));
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<(), SessionError> {
        let snapshot = {
            let mut session = self.session.lock().await;
            session.resume()?;
            session.build_snapshot(true)
        };
        self.snapshots.send_replace(Some(snapshot));
        self.spawn_loop();
        Ok(())
    }

    pub async fn set_direction(&self, dir: Direction) -> bool {
        self.session.lock().await.set_direction(dir)
    }

    pub fn teardown(&mut self) {
        self.abort_loop();
    }

    fn spawn_loop(&mut self) {
        self.abort_loop();
        let session = self.session.clone();
        let snapshots = self.snapshots.clone();
        let tick_ms = self.tick_ms;

        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let (snapshot, ended) = {
                    let mut session = session.lock().await;
                    session.step(tick_ms);
                    (session.build_snapshot(true), session.is_ended())
                };
                let state = snapshot.state;
                let score = snapshot.score;
                snapshots.send_replace(Some(snapshot));
                if ended {
                    info!(state = ?state, score, "tick_loop_finished");
                    break;
                }
            }
        }));
    }

    fn abort_loop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("tick_loop_aborted");
            task.abort();
        }
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.abort_loop();
    }
}
