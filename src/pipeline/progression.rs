// Progression records and the two-list catalog they live in.

use serde::{Deserialize, Serialize};

/// A named chord progression with a melody over it. Stored and exchanged as
/// JSON with exactly these four fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub name: String,
    pub chords: String, // space separated chord symbols, "Dm7 G7 Cmaj7"
    pub solo: String,   // space separated note tokens, "F4 B4 E5"
    pub info: String,
}

impl Progression {
    pub fn new(name: &str, chords: &str, solo: &str, info: &str) -> Self {
        Self {
            name: name.to_string(),
            chords: chords.to_string(),
            solo: solo.to_string(),
            info: info.to_string(),
        }
    }

    // Split on single spaces like the strings were written; an empty field
    // still yields one empty token.
    pub fn chord_symbols(&self) -> Vec<String> {
        self.chords.split(' ').map(str::to_string).collect()
    }

    pub fn solo_notes(&self) -> Vec<String> {
        self.solo.split(' ').map(str::to_string).collect()
    }

    /// Chord and solo token of the first step.
    pub fn first_step(&self) -> (String, Option<String>) {
        let chord = self.chords.split(' ').next().unwrap_or_default().to_string();
        let solo = self.solo.split(' ').next().map(str::to_string);
        (chord, solo)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Jazz,
    Custom,
}

impl ListKind {
    pub fn toggle(self) -> Self {
        match self {
            ListKind::Jazz => ListKind::Custom,
            ListKind::Custom => ListKind::Jazz,
        }
    }
}

/// Built-in (`jazz`, replaced on every fetch) and user-saved (`custom`,
/// append only) progressions, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub jazz: Vec<Progression>,
    pub custom: Vec<Progression>,
}

impl Catalog {
    pub fn with_custom(custom: Vec<Progression>) -> Self {
        Self { jazz: Vec::new(), custom }
    }

    pub fn list(&self, kind: ListKind) -> &[Progression] {
        match kind {
            ListKind::Jazz => &self.jazz,
            ListKind::Custom => &self.custom,
        }
    }

    pub fn get(&self, kind: ListKind, index: usize) -> Option<&Progression> {
        self.list(kind).get(index)
    }

    pub fn replace_jazz(&mut self, fetched: Vec<Progression>) {
        self.jazz = fetched;
    }

    pub fn push_custom(&mut self, progression: Progression) {
        self.custom.push(progression);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_split_on_spaces() {
        let p = Progression::new("ii-V-I", "Dm7 G7 Cmaj7", "F4 B4 E5", "");
        assert_eq!(p.chord_symbols(), vec!["Dm7", "G7", "Cmaj7"]);
        assert_eq!(p.solo_notes(), vec!["F4", "B4", "E5"]);
        assert_eq!(p.first_step(), ("Dm7".to_string(), Some("F4".to_string())));
    }

    #[test]
    fn empty_fields_give_one_empty_token() {
        let p = Progression::new("blank", "", "", "");
        assert_eq!(p.chord_symbols(), vec![""]);
        assert_eq!(p.first_step(), (String::new(), Some(String::new())));
    }

    #[test]
    fn json_shape_is_the_four_plain_fields() {
        let p = Progression::new("n", "C", "C4", "i");
        let v: serde_json::Value = serde_json::to_value(&p).unwrap();
        assert_eq!(v, serde_json::json!({"name": "n", "chords": "C", "solo": "C4", "info": "i"}));
    }

    #[test]
    fn refetch_leaves_custom_alone() {
        let mut c = Catalog::with_custom(vec![Progression::new("mine", "C", "C4", "")]);
        c.replace_jazz(vec![Progression::new("a", "C", "", ""), Progression::new("b", "D", "", "")]);
        c.replace_jazz(vec![Progression::new("z", "E", "", "")]);
        assert_eq!(c.jazz.len(), 1);
        assert_eq!(c.custom[0].name, "mine");
        assert_eq!(c.get(ListKind::Jazz, 0).map(|p| p.name.as_str()), Some("z"));
        assert!(c.get(ListKind::Custom, 3).is_none());
    }
}
