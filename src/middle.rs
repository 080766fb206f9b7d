// The app state. Input events and ticks come in, audio commands go out, and
// the TUI reads a fresh `DisplayState` every frame. Worker threads (catalog
// fetches, generation requests) report back over channels drained in
// `poll_workers`.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::audio::{DEFAULT_DELAY_SECS, DEFAULT_REVERB_LEVEL};
use crate::audio_api::AudioCommand;
use crate::tone::step_to_audio;
use crate::generator::{self, GenerateResult, ProgressionGenerator};
use crate::pipeline::persistence::CustomStore;
use crate::pipeline::progression::{Catalog, ListKind, Progression};
use crate::pipeline::provider::{self, ProgressionProvider};
use crate::player::{Player, StepEvent};
use crate::shared::{
    keyboard_notes, AnimationMode, DisplayState, InputEvent, KeyLight, PianoKey, EFFECT_STEP,
};
use crate::theory::chord_notes;

pub const GENERATE_FAILED: &str = "Failed to generate custom progression. Please try again.";

// UI slider range for both effect knobs
const EFFECT_MIN: f32 = 0.0;
const EFFECT_MAX: f32 = 1.0;

type FetchResult = anyhow::Result<Vec<Progression>>;

pub struct Middle {
    pub catalog: Catalog,
    store: CustomStore,
    provider: Arc<dyn ProgressionProvider>,
    generator: Arc<dyn ProgressionGenerator>,
    fetch_tx: Sender<FetchResult>,
    fetch_rx: Receiver<FetchResult>,
    gen_tx: Sender<GenerateResult>,
    gen_rx: Receiver<GenerateResult>,

    player: Player,
    current: Option<Progression>,
    chord: String, // highlighted chord symbol, empty when none
    solo: String,  // highlighted solo note, empty when none

    animation: AnimationMode,
    delay_time: f32,
    reverb_level: f32,

    focus: ListKind,
    selected: usize,
    fetching: bool,

    prompt: String,
    editing_prompt: bool,
    generating: bool,
    notice: Option<String>,
}

impl Middle {
    pub fn new(
        catalog: Catalog,
        store: CustomStore,
        provider: Arc<dyn ProgressionProvider>,
        generator: Arc<dyn ProgressionGenerator>,
    ) -> Self {
        let (fetch_tx, fetch_rx) = provider::fetch_channel();
        let (gen_tx, gen_rx) = crossbeam_channel::unbounded();
        Self {
            catalog,
            store,
            provider,
            generator,
            fetch_tx,
            fetch_rx,
            gen_tx,
            gen_rx,
            player: Player::default(),
            current: None,
            chord: String::new(),
            solo: String::new(),
            animation: AnimationMode::default(),
            delay_time: DEFAULT_DELAY_SECS,
            reverb_level: DEFAULT_REVERB_LEVEL,
            focus: ListKind::Jazz,
            selected: 0,
            fetching: false,
            prompt: String::new(),
            editing_prompt: false,
            generating: false,
            notice: None,
        }
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&Progression> {
        self.current.as_ref()
    }

    #[cfg(test)]
    pub fn highlighted(&self) -> (&str, &str) {
        (&self.chord, &self.solo)
    }

    #[cfg(test)]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.fetching || self.generating
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<AudioCommand> {
        match event {
            InputEvent::TogglePlay => return self.toggle_play(),
            InputEvent::SelectPrev => self.selected = self.selected.saturating_sub(1),
            InputEvent::SelectNext => {
                let len = self.catalog.list(self.focus).len();
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            InputEvent::SwitchList => {
                self.focus = self.focus.toggle();
                self.selected = 0;
            }
            InputEvent::LoadSelected => {
                if let Some(p) = self.catalog.get(self.focus, self.selected).cloned() {
                    return self.load_progression(p);
                }
            }
            InputEvent::AdjustSpeed(delta) => self.player.set_speed(self.player.speed() + delta),
            InputEvent::CycleAnimation => self.animation = self.animation.next(),
            InputEvent::AdjustDelay(delta) => {
                self.delay_time = step_knob(self.delay_time, delta);
                return vec![AudioCommand::SetDelayTime(self.delay_time)];
            }
            InputEvent::AdjustReverb(delta) => {
                self.reverb_level = step_knob(self.reverb_level, delta);
                return vec![AudioCommand::SetReverbLevel(self.reverb_level)];
            }
            InputEvent::Refetch => self.refetch(),
            InputEvent::BeginPrompt => {
                if !self.generating {
                    self.editing_prompt = true;
                }
            }
            InputEvent::PromptChar(c) => {
                if self.editing_prompt {
                    self.prompt.push(c);
                }
            }
            InputEvent::PromptBackspace => {
                if self.editing_prompt {
                    self.prompt.pop();
                }
            }
            InputEvent::SubmitPrompt => self.start_generation(),
            InputEvent::CancelPrompt => self.editing_prompt = false,
            InputEvent::Dismiss => self.notice = None,
            InputEvent::Quit => {}
        }
        Vec::new()
    }

    /// Advance playback by `elapsed` seconds.
    pub fn tick(&mut self, elapsed: f64) -> Vec<AudioCommand> {
        let steps = self.player.tick(elapsed);
        steps.into_iter().flat_map(|s| self.show_step(s)).collect()
    }

    pub fn toggle_play(&mut self) -> Vec<AudioCommand> {
        let was_playing = self.player.is_playing();
        match self.player.toggle(self.current.as_ref()) {
            Some(first) => self.show_step(first),
            None => {
                if was_playing {
                    self.chord.clear();
                    self.solo.clear();
                }
                Vec::new()
            }
        }
    }

    /// Make `progression` current. A running session is stopped first; the
    /// new first step is then shown and sounded once, without starting playback.
    pub fn load_progression(&mut self, progression: Progression) -> Vec<AudioCommand> {
        if self.player.is_playing() {
            self.toggle_play();
        }
        let (chord, solo) = progression.first_step();
        info!(name = %progression.name, "loaded progression");
        self.current = Some(progression);
        self.show_step(StepEvent { chord, solo })
    }

    fn show_step(&mut self, step: StepEvent) -> Vec<AudioCommand> {
        let cmds = step_to_audio(&step.chord, step.solo.as_deref());
        self.chord = step.chord;
        self.solo = step.solo.unwrap_or_default();
        cmds
    }

    /// Replace the built-in list in the background. Only one fetch runs at a
    /// time; asking again while one is out does nothing.
    pub fn refetch(&mut self) {
        if self.fetching {
            debug!("fetch already running");
            return;
        }
        self.fetching = true;
        provider::spawn_fetch(Arc::clone(&self.provider), self.fetch_tx.clone());
    }

    fn start_generation(&mut self) {
        if self.generating {
            return;
        }
        self.editing_prompt = false;
        self.generating = true;
        info!("generating progression");
        generator::spawn_generate(
            Arc::clone(&self.generator),
            self.prompt.clone(),
            self.gen_tx.clone(),
        );
    }

    /// Append to the custom list and rewrite the durable slot.
    pub fn save_custom(&mut self, progression: Progression) {
        if let Err(e) = self.store.save(&mut self.catalog, progression) {
            error!("saving custom progressions failed: {e:#}");
            self.notice = Some(format!("Could not save progressions: {e}"));
        }
    }

    /// Apply whatever the worker threads have finished. Late results still
    /// land on the current state.
    pub fn poll_workers(&mut self) -> Vec<AudioCommand> {
        let mut cmds = Vec::new();

        while let Ok(result) = self.fetch_rx.try_recv() {
            self.fetching = false;
            match result {
                Ok(list) => {
                    info!(count = list.len(), "built-in progressions fetched");
                    self.catalog.replace_jazz(list);
                    self.clamp_selection();
                }
                Err(e) => warn!("fetching progressions failed: {e:#}"),
            }
        }

        while let Ok(result) = self.gen_rx.try_recv() {
            self.generating = false;
            self.prompt.clear();
            match result {
                Ok(progression) => {
                    self.save_custom(progression.clone());
                    cmds.extend(self.load_progression(progression));
                }
                Err(e) => {
                    error!("error generating custom progression: {e}");
                    self.notice = Some(GENERATE_FAILED.to_string());
                }
            }
        }

        cmds
    }

    fn clamp_selection(&mut self) {
        let len = self.catalog.list(self.focus).len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn display_state(&self) -> DisplayState {
        let chord_keys = chord_notes(&self.chord);
        let keys = keyboard_notes()
            .into_iter()
            .map(|note| {
                let chord_lit = self.animation.shows_chords() && chord_keys.contains(&note);
                let solo_lit = self.animation.shows_solo() && self.solo == note;
                let light = if solo_lit {
                    KeyLight::Solo
                } else if chord_lit {
                    KeyLight::Chord
                } else {
                    KeyLight::Off
                };
                PianoKey { black: note.contains('#'), note, light }
            })
            .collect();

        DisplayState {
            keys,
            current_chord: self.chord.clone(),
            current_solo: self.solo.clone(),
            playing: self.player.is_playing(),
            speed: self.player.speed(),
            animation: self.animation,
            delay_time: self.delay_time,
            reverb_level: self.reverb_level,
            progression: self.current.clone(),
            jazz: self.catalog.jazz.iter().map(|p| p.name.clone()).collect(),
            custom: self.catalog.custom.iter().map(|p| p.name.clone()).collect(),
            focus: self.focus,
            selected: self.selected,
            fetching: self.fetching,
            prompt: self.prompt.clone(),
            editing_prompt: self.editing_prompt,
            generating: self.generating,
            notice: self.notice.clone(),
        }
    }
}

// one slider notch, kept on the 0.1 grid
fn step_knob(value: f32, delta: f32) -> f32 {
    ((value + delta).clamp(EFFECT_MIN, EFFECT_MAX) / EFFECT_STEP).round() * EFFECT_STEP
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_api::VoiceParams;
    use crate::generator::GenerateError;
    use crate::pipeline::persistence::{self, CUSTOM_FILE};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    struct FixedProvider(Vec<Progression>);

    impl ProgressionProvider for FixedProvider {
        fn fetch_progressions(&self) -> anyhow::Result<Vec<Progression>> {
            Ok(self.0.clone())
        }
    }

    // Counts calls and takes a moment to answer.
    #[derive(Default)]
    struct CountingProvider(AtomicUsize);

    impl ProgressionProvider for CountingProvider {
        fn fetch_progressions(&self) -> anyhow::Result<Vec<Progression>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(jazz())
        }
    }

    // Hands out queued replies and remembers the prompts it saw.
    #[derive(Default)]
    struct ScriptedGenerator {
        replies: Mutex<Vec<GenerateResult>>,
        seen: Mutex<Vec<String>>,
    }

    impl ProgressionGenerator for ScriptedGenerator {
        fn generate(&self, description: &str) -> Result<Progression, GenerateError> {
            self.seen.lock().unwrap().push(description.to_string());
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn jazz() -> Vec<Progression> {
        vec![
            Progression::new("ii-V-I", "Dm7 G7 Cmaj7", "F4 B4 E5", ""),
            Progression::new("I-vi-ii-V", "Cmaj7 Am7 Dm7 G7", "E5 C5 F5 B4", ""),
        ]
    }

    fn middle_with(dir: &std::path::Path, generator: Arc<ScriptedGenerator>) -> Middle {
        Middle::new(
            Catalog::default(),
            CustomStore::new(dir.join(CUSTOM_FILE)),
            Arc::new(FixedProvider(jazz())),
            generator,
        )
    }

    // wait for the worker threads, collecting what they cause
    fn settle(m: &mut Middle) -> Vec<AudioCommand> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut cmds = Vec::new();
        loop {
            cmds.extend(m.poll_workers());
            if !m.is_busy() || Instant::now() > deadline {
                return cmds;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn frequencies(cmds: &[AudioCommand]) -> Vec<f32> {
        cmds.iter()
            .filter_map(|c| match c {
                AudioCommand::PlayVoice(VoiceParams { frequency, .. }) => Some(*frequency),
                _ => None,
            })
            .collect()
    }

    fn loaded(dir: &std::path::Path) -> Middle {
        let mut m = middle_with(dir, Arc::default());
        m.refetch();
        settle(&mut m);
        m
    }

    #[test]
    fn refetch_fills_jazz_list() {
        let dir = tempfile::tempdir().unwrap();
        let m = loaded(dir.path());
        assert_eq!(m.display_state().jazz, vec!["ii-V-I", "I-vi-ii-V"]);
        assert!(!m.display_state().fetching);
    }

    #[test]
    fn loading_highlights_and_sounds_first_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = loaded(dir.path());
        let cmds = m.handle_input(InputEvent::LoadSelected);
        assert_eq!(m.highlighted(), ("Dm7", "F4"));
        assert_eq!(frequencies(&cmds).len(), 5); // four chord tones + solo
        assert!(!m.is_playing());
    }

    #[test]
    fn toggle_twice_clears_highlight() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = loaded(dir.path());
        m.handle_input(InputEvent::LoadSelected);
        m.handle_input(InputEvent::TogglePlay);
        assert!(m.is_playing());
        m.tick(1.0);
        assert_eq!(m.highlighted(), ("G7", "B4"));
        m.handle_input(InputEvent::TogglePlay);
        assert!(!m.is_playing());
        assert_eq!(m.highlighted(), ("", ""));
        assert!(m.tick(5.0).is_empty());
        assert!(m.display_state().keys.iter().all(|k| k.light == KeyLight::Off));
    }

    #[test]
    fn play_without_progression_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = middle_with(dir.path(), Arc::default());
        assert!(m.handle_input(InputEvent::TogglePlay).is_empty());
        assert!(!m.is_playing());
    }

    #[test]
    fn loading_while_playing_stops_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = loaded(dir.path());
        m.handle_input(InputEvent::LoadSelected);
        m.handle_input(InputEvent::TogglePlay);
        m.tick(1.0);

        m.handle_input(InputEvent::SelectNext);
        m.handle_input(InputEvent::LoadSelected);
        assert!(!m.is_playing());
        assert_eq!(m.current().map(|p| p.name.as_str()), Some("I-vi-ii-V"));
        assert_eq!(m.highlighted(), ("Cmaj7", "E5"));
        // the old session is gone for good
        assert!(m.tick(10.0).is_empty());
        assert_eq!(m.highlighted(), ("Cmaj7", "E5"));
    }

    #[test]
    fn keyboard_lights_follow_animation_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = middle_with(dir.path(), Arc::default());
        m.load_progression(Progression::new("x", "Am7", "C5", ""));

        let lit = |m: &Middle, light: KeyLight| -> Vec<String> {
            m.display_state()
                .keys
                .into_iter()
                .filter(|k| k.light == light)
                .map(|k| k.note)
                .collect()
        };
        assert_eq!(lit(&m, KeyLight::Chord), vec!["C4", "E4", "G4", "A4"]);
        assert_eq!(lit(&m, KeyLight::Solo), vec!["C5"]);

        m.handle_input(InputEvent::CycleAnimation); // Both -> Solo
        assert!(lit(&m, KeyLight::Chord).is_empty());
        assert_eq!(lit(&m, KeyLight::Solo), vec!["C5"]);

        m.handle_input(InputEvent::CycleAnimation); // Solo -> Chords
        assert_eq!(lit(&m, KeyLight::Chord).len(), 4);
        assert!(lit(&m, KeyLight::Solo).is_empty());
    }

    #[test]
    fn effect_knobs_send_live_updates() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = middle_with(dir.path(), Arc::default());
        assert_eq!(m.handle_input(InputEvent::AdjustDelay(0.1)), vec![AudioCommand::SetDelayTime(0.4)]);
        for _ in 0..20 {
            m.handle_input(InputEvent::AdjustReverb(0.1));
        }
        assert_eq!(m.handle_input(InputEvent::AdjustReverb(0.1)), vec![AudioCommand::SetReverbLevel(1.0)]);
        for _ in 0..20 {
            m.handle_input(InputEvent::AdjustDelay(-0.1));
        }
        assert_eq!(m.display_state().delay_time, 0.0);
    }

    #[test]
    fn generated_progression_is_saved_and_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let generated = Progression::new("Gen", "Am F C G", "A4 C5", "pop");
        let generator = Arc::new(ScriptedGenerator::default());
        generator.replies.lock().unwrap().push(Ok(generated.clone()));
        let mut m = middle_with(dir.path(), Arc::clone(&generator));

        m.handle_input(InputEvent::BeginPrompt);
        for c in "sad pop".chars() {
            m.handle_input(InputEvent::PromptChar(c));
        }
        m.handle_input(InputEvent::SubmitPrompt);
        assert!(m.display_state().generating);
        let cmds = settle(&mut m);

        assert_eq!(generator.seen.lock().unwrap().as_slice(), ["sad pop"]);
        assert_eq!(m.current(), Some(&generated));
        assert_eq!(m.highlighted(), ("Am", "A4"));
        assert_eq!(frequencies(&cmds).len(), 4);
        assert!(m.display_state().prompt.is_empty());
        let stored = persistence::load_custom(&dir.path().join(CUSTOM_FILE)).unwrap();
        assert_eq!(stored, vec![generated]);
    }

    #[test]
    fn failed_generation_leaves_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::default());
        generator.replies.lock().unwrap().push(Err(GenerateError::EmptyReply));
        let mut m = middle_with(dir.path(), Arc::clone(&generator));
        m.load_progression(Progression::new("kept", "C", "C4", ""));

        m.handle_input(InputEvent::BeginPrompt);
        m.handle_input(InputEvent::PromptChar('x'));
        m.handle_input(InputEvent::SubmitPrompt);
        settle(&mut m);

        assert_eq!(m.notice(), Some(GENERATE_FAILED));
        assert_eq!(m.current().map(|p| p.name.as_str()), Some("kept"));
        assert!(m.catalog.custom.is_empty());
        assert!(!dir.path().join(CUSTOM_FILE).exists());
        assert!(m.display_state().prompt.is_empty());

        m.handle_input(InputEvent::Dismiss);
        assert_eq!(m.notice(), None);
    }

    #[test]
    fn prompt_ignores_typing_until_opened() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = middle_with(dir.path(), Arc::default());
        m.handle_input(InputEvent::PromptChar('a'));
        assert!(m.display_state().prompt.is_empty());
        m.handle_input(InputEvent::BeginPrompt);
        m.handle_input(InputEvent::PromptChar('a'));
        m.handle_input(InputEvent::PromptChar('b'));
        m.handle_input(InputEvent::PromptBackspace);
        assert_eq!(m.display_state().prompt, "a");
        m.handle_input(InputEvent::CancelPrompt);
        assert!(!m.display_state().editing_prompt);
    }

    #[test]
    fn selection_stays_inside_the_focused_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = loaded(dir.path());
        for _ in 0..5 {
            m.handle_input(InputEvent::SelectNext);
        }
        assert_eq!(m.display_state().selected, 1);
        m.handle_input(InputEvent::SwitchList);
        assert_eq!(m.display_state().focus, ListKind::Custom);
        assert_eq!(m.display_state().selected, 0);
        // empty custom list: nothing to load
        assert!(m.handle_input(InputEvent::LoadSelected).is_empty());
    }

    #[test]
    fn second_refetch_while_busy_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(CountingProvider::default());
        let mut m = Middle::new(
            Catalog::default(),
            CustomStore::new(dir.path().join(CUSTOM_FILE)),
            Arc::clone(&provider) as Arc<dyn ProgressionProvider>,
            Arc::new(ScriptedGenerator::default()),
        );
        m.refetch();
        m.handle_input(InputEvent::Refetch);
        assert!(m.display_state().fetching);
        settle(&mut m);

        assert!(!m.display_state().fetching);
        assert_eq!(provider.0.load(Ordering::SeqCst), 1);
        assert_eq!(m.display_state().jazz.len(), 2);

        // once the first is back a new one may start
        m.refetch();
        settle(&mut m);
        assert_eq!(provider.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn late_generation_result_replaces_whatever_is_playing() {
        let dir = tempfile::tempdir().unwrap();
        let generated = Progression::new("Gen", "Am F C G", "A4 C5", "pop");
        let generator = Arc::new(ScriptedGenerator::default());
        generator.replies.lock().unwrap().push(Ok(generated.clone()));
        let mut m = middle_with(dir.path(), Arc::clone(&generator));

        m.handle_input(InputEvent::BeginPrompt);
        m.handle_input(InputEvent::PromptChar('x'));
        m.handle_input(InputEvent::SubmitPrompt);

        // the user moves on before the reply is picked up
        m.load_progression(Progression::new("other", "Dm7 G7", "F4 B4", ""));
        m.handle_input(InputEvent::TogglePlay);
        assert!(m.is_playing());
        settle(&mut m);

        assert_eq!(m.current(), Some(&generated));
        assert!(!m.is_playing());
        assert_eq!(m.highlighted(), ("Am", "A4"));
        assert_eq!(m.catalog.custom, vec![generated]);
    }

    #[test]
    fn failed_save_keeps_the_append_and_shows_a_notice() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the slot file should be makes the write fail
        std::fs::create_dir_all(dir.path().join(CUSTOM_FILE)).unwrap();
        let generated = Progression::new("Gen", "C G", "E4 D4", "");
        let generator = Arc::new(ScriptedGenerator::default());
        generator.replies.lock().unwrap().push(Ok(generated.clone()));
        let mut m = middle_with(dir.path(), Arc::clone(&generator));

        m.handle_input(InputEvent::BeginPrompt);
        m.handle_input(InputEvent::PromptChar('x'));
        m.handle_input(InputEvent::SubmitPrompt);
        settle(&mut m);

        assert!(m.notice().is_some_and(|n| n.starts_with("Could not save progressions")));
        assert_eq!(m.catalog.custom, vec![generated.clone()]);
        assert_eq!(m.current(), Some(&generated));
    }
}
