// Keybinds (resolved by tui/input.rs):
//
//   Space         //  TogglePlay
//   Up / Down     //  SelectPrev / SelectNext in the focused list
//   Tab           //  SwitchList (Jazz <-> Custom)
//   Enter         //  LoadSelected
//   [ / ]         //  AdjustSpeed(-0.1 / +0.1)
//   m             //  CycleAnimation
//   d / D         //  AdjustDelay(-0.1 / +0.1)
//   v / V         //  AdjustReverb(-0.1 / +0.1)
//   f             //  Refetch
//   /             //  BeginPrompt; then typed chars, Backspace, Enter submits, Esc cancels
//   Esc           //  Quit
//
// While a notice is up, any key dismisses it and does nothing else.
//
// Only the middle layer holds playback, catalog and effect state; the TUI
// renders the `DisplayState` it is handed every frame.

use crate::pipeline::progression::{ListKind, Progression};
use crate::theory::PITCH_CLASSES;

pub const SPEED_STEP: f32 = 0.1;
pub const EFFECT_STEP: f32 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    TogglePlay,
    SelectPrev,
    SelectNext,
    SwitchList,
    LoadSelected,
    AdjustSpeed(f32),
    CycleAnimation,
    AdjustDelay(f32),
    AdjustReverb(f32),
    Refetch,

    // prompt box
    BeginPrompt,
    PromptChar(char),
    PromptBackspace,
    SubmitPrompt,
    CancelPrompt,

    Dismiss,
    Quit,
}

/// Which highlights the keyboard shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimationMode {
    Chords,
    #[default]
    Both,
    Solo,
}

impl AnimationMode {
    pub fn next(self) -> Self {
        match self {
            AnimationMode::Chords => AnimationMode::Both,
            AnimationMode::Both => AnimationMode::Solo,
            AnimationMode::Solo => AnimationMode::Chords,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnimationMode::Chords => "Chords Only",
            AnimationMode::Both => "Chords and Solo",
            AnimationMode::Solo => "Solo Only",
        }
    }

    pub fn shows_chords(self) -> bool {
        matches!(self, AnimationMode::Chords | AnimationMode::Both)
    }

    pub fn shows_solo(self) -> bool {
        matches!(self, AnimationMode::Solo | AnimationMode::Both)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyLight {
    Off,
    Chord,
    Solo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PianoKey {
    pub note: String, // "C4", "F#5"
    pub black: bool,
    pub light: KeyLight,
}

/// Note names of every key on the keyboard, low to high: octaves 0 through 8,
/// starting at D#0 and ending at C8.
pub fn keyboard_notes() -> Vec<String> {
    (0..=8)
        .flat_map(|octave| {
            PITCH_CLASSES
                .iter()
                .enumerate()
                .filter(move |(i, _)| !(octave == 0 && *i < 3) && !(octave == 8 && *i > 0))
                .map(move |(_, name)| format!("{name}{octave}"))
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub keys: Vec<PianoKey>,
    pub current_chord: String,
    pub current_solo: String,

    pub playing: bool,
    pub speed: f32,
    pub animation: AnimationMode,
    pub delay_time: f32,
    pub reverb_level: f32,

    pub progression: Option<Progression>, // info panel + read-only chord box
    pub jazz: Vec<String>,
    pub custom: Vec<String>,
    pub focus: ListKind,
    pub selected: usize,
    pub fetching: bool,

    pub prompt: String,
    pub editing_prompt: bool,
    pub generating: bool,

    pub notice: Option<String>, // modal until the next key press
}
