// The one durable slot: a JSON array of custom progressions, read at
// startup and rewritten whole on every save.
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use super::progression::{Catalog, Progression};

pub const CUSTOM_FILE: &str = "custom_progressions.json";

// <data_dir>/custom_progressions.json
pub fn custom_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CUSTOM_FILE)
}

/// Read the saved list. A missing slot is an empty list; a slot that exists
/// but doesn't parse is an error for the caller to deal with.
pub fn load_custom(path: &Path) -> anyhow::Result<Vec<Progression>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no saved progressions yet");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let list: Vec<Progression> = serde_json::from_str(&data)
        .with_context(|| format!("parsing saved progressions in {}", path.display()))?;
    info!(count = list.len(), "loaded custom progressions");
    Ok(list)
}

// Overwrite the slot, making the directory if it doesn't exist already
pub fn save_custom(path: &Path, list: &[Progression]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(list)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Catalog side of a save: append in memory, then rewrite the slot.
/// The in-memory append sticks even if the write fails.
pub struct CustomStore {
    path: PathBuf,
}

impl CustomStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<Vec<Progression>> {
        load_custom(&self.path)
    }

    pub fn save(&self, catalog: &mut Catalog, progression: Progression) -> anyhow::Result<()> {
        catalog.push_custom(progression);
        save_custom(&self.path, &catalog.custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_slot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_custom(&custom_file_path(dir.path())).unwrap().is_empty());
    }

    #[test]
    fn saved_list_reloads_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = CustomStore::new(dir.path().join("nested").join(CUSTOM_FILE));
        let mut catalog = Catalog::default();
        let a = Progression::new("first", "C G Am F", "E5 D5 C5 C5", "pop");
        let b = Progression::new("second", "Dm7 G7", "F4 B4", "ii-V");
        let dup = Progression::new("first", "C", "C4", "same name is fine");
        store.save(&mut catalog, a.clone()).unwrap();
        store.save(&mut catalog, b.clone()).unwrap();
        store.save(&mut catalog, dup.clone()).unwrap();

        let reloaded = CustomStore::new(store.path().to_path_buf()).load().unwrap();
        assert_eq!(reloaded, vec![a, b, dup]);
        assert_eq!(reloaded, catalog.custom);
    }

    #[test]
    fn malformed_slot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = custom_file_path(dir.path());
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_custom(&path).is_err());

        std::fs::write(&path, r#"[{"name": "missing fields"}]"#).unwrap();
        assert!(load_custom(&path).is_err());
    }

    #[test]
    fn failed_write_keeps_memory_append() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should be makes the write fail
        let path = dir.path().join("slot");
        std::fs::create_dir_all(&path).unwrap();
        let store = CustomStore::new(path);
        let mut catalog = Catalog::default();
        assert!(store.save(&mut catalog, Progression::new("x", "C", "C4", "")).is_err());
        assert_eq!(catalog.custom.len(), 1);
    }
}
