// Playback of one progression at a time. The driver is stepped from the UI
// tick; it never sleeps or spawns anything itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::pipeline::progression::Progression;

pub const MIN_SPEED: f32 = 0.1;
pub const MAX_SPEED: f32 = 2.0;
pub const DEFAULT_SPEED: f32 = 1.0;

/// Shared stop flag for one playback session. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What to sound and highlight for one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepEvent {
    pub chord: String,
    pub solo: Option<String>,
}

#[derive(Debug)]
struct Session {
    chords: Vec<String>,
    solo: Vec<String>,
    cursor: usize,
    until_next: f64, // seconds
    cancel: CancelToken,
}

impl Session {
    fn step(&self) -> StepEvent {
        StepEvent {
            chord: self.chords[self.cursor].clone(),
            solo: self.solo.get(self.cursor).cloned(),
        }
    }
}

#[derive(Debug, Default)]
enum PlayState {
    #[default]
    Stopped,
    Playing(Session),
}

#[derive(Debug)]
pub struct Player {
    state: PlayState,
    speed: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            state: PlayState::Stopped,
            speed: DEFAULT_SPEED,
        }
    }
}

impl Player {
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlayState::Playing(_))
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        // keep to the slider's 0.1 grid
        self.speed = ((speed.clamp(MIN_SPEED, MAX_SPEED) * 10.0).round()) / 10.0;
    }

    /// Seconds between steps at the current speed.
    pub fn step_interval(&self) -> f64 {
        1.0 / self.speed as f64
    }

    #[cfg(test)]
    pub fn cursor(&self) -> Option<usize> {
        match &self.state {
            PlayState::Playing(s) => Some(s.cursor),
            PlayState::Stopped => None,
        }
    }

    /// Token of the running session, if any.
    #[cfg(test)]
    pub fn cancel_token(&self) -> Option<CancelToken> {
        match &self.state {
            PlayState::Playing(s) => Some(s.cancel.clone()),
            PlayState::Stopped => None,
        }
    }

    /// Stopped -> Playing when something is loaded (returns the first step,
    /// to be sounded right away); Playing -> Stopped otherwise.
    pub fn toggle(&mut self, progression: Option<&Progression>) -> Option<StepEvent> {
        if self.is_playing() {
            self.stop();
            return None;
        }
        let progression = progression?;
        self.start(progression)
    }

    fn start(&mut self, progression: &Progression) -> Option<StepEvent> {
        let session = Session {
            chords: progression.chord_symbols(),
            solo: progression.solo_notes(),
            cursor: 0,
            until_next: self.step_interval(),
            cancel: CancelToken::new(),
        };
        let first = session.step();
        debug!(name = %progression.name, steps = session.chords.len(), "playback started");
        self.state = PlayState::Playing(session);
        Some(first)
    }

    /// Cancel the session. Voices already handed to the engine ring out.
    pub fn stop(&mut self) {
        if let PlayState::Playing(session) = std::mem::take(&mut self.state) {
            session.cancel.cancel();
            debug!(cursor = session.cursor, "playback stopped");
        }
    }

    /// Advance the clock by `elapsed` seconds and return every step that came
    /// due. The token is checked before each step and before rescheduling, so
    /// a cancelled session never produces another step.
    pub fn tick(&mut self, elapsed: f64) -> Vec<StepEvent> {
        let interval = self.step_interval();
        let PlayState::Playing(session) = &mut self.state else {
            return Vec::new();
        };

        let mut due = Vec::new();
        session.until_next -= elapsed;
        while session.until_next <= 0.0 {
            if session.cancel.is_cancelled() {
                break;
            }
            session.cursor = (session.cursor + 1) % session.chords.len();
            due.push(session.step());
            session.until_next += interval;
        }

        if session.cancel.is_cancelled() {
            self.state = PlayState::Stopped;
        }
        due
    }
}
