// Equal-tempered pitch math and the chord table the visualizer knows about.

pub const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const A4_HZ: f64 = 440.0;
const A_INDEX: i32 = 9;
const CHORD_OCTAVE: i32 = 4;

// Stand-in name for a pitch slot that fell off the table. It matches no key
// but still parses, at index -1.
pub const UNKNOWN_PITCH: &str = "?";

/// Index of a pitch name in [`PITCH_CLASSES`], or -1 when it isn't one.
pub fn pitch_index(name: &str) -> i32 {
    PITCH_CLASSES
        .iter()
        .position(|p| *p == name)
        .map_or(-1, |i| i as i32)
}

/// Split a note token like "F#5" into its pitch name and octave.
/// The octave is `None` when the token has no trailing digits.
pub fn split_note(note: &str) -> (&str, Option<i32>) {
    let digits_at = note
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map_or(note.len(), |(i, _)| i);
    let (name, octave) = note.split_at(digits_at);
    (name, octave.parse().ok())
}

/// Frequency of a note token, A4 = 440 Hz.
///
/// Unknown pitch names are not rejected: they land on index -1 and produce a
/// frequency a semitone below the octave's C. A missing octave gives NaN,
/// which the engine renders as silence.
pub fn note_to_frequency(note: &str) -> f32 {
    let (name, octave) = split_note(note);
    let Some(octave) = octave else {
        return f32::NAN;
    };
    let index = pitch_index(name);
    let exponent = (index - A_INDEX) as f64 / 12.0 + (octave - 4) as f64;
    (A4_HZ * 2f64.powf(exponent)) as f32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChordQuality {
    Major,
    Minor,
    Dominant7,
    Major7,
    Minor7,
}

impl ChordQuality {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" | "maj" => Some(ChordQuality::Major),
            "m" | "min" => Some(ChordQuality::Minor),
            "7" => Some(ChordQuality::Dominant7),
            "maj7" => Some(ChordQuality::Major7),
            "m7" | "min7" => Some(ChordQuality::Minor7),
            _ => None,
        }
    }

    /// Semitones above the root.
    pub fn intervals(self) -> &'static [i32] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
        }
    }
}

/// Note tokens for a chord symbol, all voiced in octave 4.
///
/// The root is the first character only, so "F#m7" reads as root F with the
/// quality "#m7" and comes back empty. Intervals wrap with `% 12` and the
/// octave is never bumped, so "Am7" gives A4 C4 E4 G4. An unknown root
/// keeps every slot: one whose remainder is still negative comes out as
/// `UNKNOWN_PITCH` and sounds a semitone below C4.
pub fn chord_notes(symbol: &str) -> Vec<String> {
    let mut chars = symbol.chars();
    let Some(root) = chars.next() else {
        return Vec::new();
    };
    let Some(quality) = ChordQuality::from_suffix(chars.as_str()) else {
        return Vec::new();
    };
    let root_index = pitch_index(&root.to_uppercase().to_string());

    quality
        .intervals()
        .iter()
        // signed remainder: an unknown root can still land below zero
        .map(|interval| {
            let name = usize::try_from((root_index + interval) % 12)
                .map_or(UNKNOWN_PITCH, |i| PITCH_CLASSES[i]);
            format!("{name}{CHORD_OCTAVE}")
        })
        .collect()
}
