use serde::Serialize;
use tracing::debug;

use crate::types::RuntimeEvent;

/// Receives every semantic event the session emits, in order.
pub trait EventListener: Send {
    fn on_event(&mut self, event: &RuntimeEvent);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    Intro,
    Chomp,
    PowerPellet,
    FrightenedStart,
    FrightenedStop,
    EatGhost,
    EatFruit,
    ExtraLife,
    Death,
    LevelClear,
    Victory,
    GameOver,
}

pub fn cue_for_event(event: &RuntimeEvent) -> Option<SoundCue> {
    let cue = match event {
        RuntimeEvent::SessionStarted { .. } => SoundCue::Intro,
        RuntimeEvent::DotCollected { power: false, .. } => SoundCue::Chomp,
        RuntimeEvent::DotCollected { power: true, .. } => SoundCue::PowerPellet,
        RuntimeEvent::PowerModeStarted { .. } => SoundCue::FrightenedStart,
        RuntimeEvent::PowerModeEnded => SoundCue::FrightenedStop,
        RuntimeEvent::GhostEaten { .. } => SoundCue::EatGhost,
        RuntimeEvent::FruitEaten { .. } => SoundCue::EatFruit,
        RuntimeEvent::ExtraLife { .. } => SoundCue::ExtraLife,
        RuntimeEvent::PlayerCaught { .. } => SoundCue::Death,
        RuntimeEvent::LevelCleared { .. } => SoundCue::LevelClear,
        RuntimeEvent::SessionWon { .. } => SoundCue::Victory,
        RuntimeEvent::SessionLost { .. } => SoundCue::GameOver,
        _ => return None,
    };
    Some(cue)
}

/// Playback backend. Implementations must not block the tick.
pub trait AudioSink: Send {
    fn play(&mut self, cue: SoundCue);
}

/// Logs cues instead of playing them.
#[derive(Clone, Debug, Default)]
pub struct TracingSink;

impl AudioSink for TracingSink {
    fn play(&mut self, cue: SoundCue) {
        debug!(cue = ?cue, "sound_cue");
    }
}

pub struct AudioBridge<S: AudioSink> {
    sink: S,
    muted: bool,
}

impl<S: AudioSink> AudioBridge<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, muted: false }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: AudioSink> EventListener for AudioBridge<S> {
    fn on_event(&mut self, event: &RuntimeEvent) {
        if self.muted {
            return;
        }
        if let Some(cue) = cue_for_event(event) {
            self.sink.play(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::engine::{GameSession, SessionConfig};
    use crate::types::MazeKind;

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<SoundCue>>>);

    impl AudioSink for SharedSink {
        fn play(&mut self, cue: SoundCue) {
            self.0.lock().expect("sink lock").push(cue);
        }
    }

    #[test]
    fn dots_map_to_distinct_cues() {
        let normal = RuntimeEvent::DotCollected {
            x: 1,
            y: 1,
            power: false,
        };
        let power = RuntimeEvent::DotCollected {
            x: 1,
            y: 1,
            power: true,
        };
        assert_eq!(cue_for_event(&normal), Some(SoundCue::Chomp));
        assert_eq!(cue_for_event(&power), Some(SoundCue::PowerPellet));
        assert_eq!(cue_for_event(&RuntimeEvent::SessionPaused), None);
    }

    #[test]
    fn bridge_plays_cues_from_session_events() {
        let sink = SharedSink::default();
        let played = sink.0.clone();
        let mut session = GameSession::new(SessionConfig {
            maze_kind: MazeKind::Classic,
            ..SessionConfig::default()
        })
        .expect("maze builds");
        session.subscribe(Box::new(AudioBridge::new(sink)));
        session.start().expect("start");

        assert_eq!(*played.lock().expect("sink lock"), vec![SoundCue::Intro]);
    }

    #[test]
    fn muted_bridge_stays_silent() {
        let sink = SharedSink::default();
        let played = sink.0.clone();
        let mut bridge = AudioBridge::new(sink);
        bridge.set_muted(true);
        bridge.on_event(&RuntimeEvent::SessionLost { score: 0 });
        assert!(played.lock().expect("sink lock").is_empty());
        bridge.set_muted(false);
        bridge.on_event(&RuntimeEvent::SessionLost { score: 0 });
        assert_eq!(bridge.sink().0.lock().expect("sink lock").len(), 1);
    }
}
