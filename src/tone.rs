// Turns musical tokens into engine commands. Every note is the same short
// piano voice; chords are rolled slightly so they read as a strum.

use crate::audio_api::{AudioCommand, VoiceParams};
use crate::theory::{chord_notes, note_to_frequency};

pub const NOTE_DURATION: f32 = 0.5;
pub const ARPEGGIO_STEP: f32 = 0.02;

pub fn note_to_audio(note: &str) -> AudioCommand {
    AudioCommand::PlayVoice(VoiceParams {
        frequency: note_to_frequency(note),
        offset: 0.0,
        duration: NOTE_DURATION,
    })
}

pub fn chord_to_audio(chord: &str) -> Vec<AudioCommand> {
    chord_notes(chord)
        .iter()
        .enumerate()
        .map(|(i, note)| {
            AudioCommand::PlayVoice(VoiceParams {
                frequency: note_to_frequency(note),
                offset: i as f32 * ARPEGGIO_STEP,
                duration: NOTE_DURATION,
            })
        })
        .collect()
}

/// Commands for one playback step: the chord, then the solo note if any.
pub fn step_to_audio(chord: &str, solo: Option<&str>) -> Vec<AudioCommand> {
    let mut cmds = chord_to_audio(chord);
    if let Some(note) = solo.filter(|n| !n.is_empty()) {
        cmds.push(note_to_audio(note));
    }
    cmds
}
