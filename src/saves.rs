//! Named save slots.
//!
//! Each slot is one JSON file `<save_id>.json` holding
//! `{ "version", "meta", "state" }`, where `state` is an
//! [`EcosystemSnapshot`]. Save ids are a local timestamp followed by a
//! slug of the display name.

use crate::checkpoint::{EcosystemSnapshot, PersistenceError};
use crate::ecology::PopulationCounts;
use chrono::{Local, SecondsFormat};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SAVE_VERSION: u32 = 1;
const MAX_SLUG_LEN: usize = 40;

/// Descriptive header of a save slot
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveMeta {
    #[serde(default)]
    pub save_id: String,
    #[serde(default)]
    pub save_name: String,
    /// RFC 3339 local time, second precision
    #[serde(default)]
    pub saved_at: String,
    /// Completed turns at save time
    #[serde(default)]
    pub cycle: u64,
    #[serde(default)]
    pub entities_total: usize,
    #[serde(default)]
    pub counts: PopulationCounts,
    #[serde(default)]
    pub summary: String,
}

impl SaveMeta {
    pub fn new(cycle: u64, counts: PopulationCounts, summary: impl Into<String>) -> Self {
        Self {
            cycle,
            entities_total: counts.total(),
            counts,
            summary: summary.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub meta: SaveMeta,
    pub state: EcosystemSnapshot,
}

fn default_version() -> u32 {
    SAVE_VERSION
}

/// Filesystem-safe form of a display name
pub fn slugify(name: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    let slug: String = joined
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_SLUG_LEN)
        .collect();
    if slug.is_empty() {
        "save".to_string()
    } else {
        slug
    }
}

fn timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Manages the JSON save slots in one directory
pub struct SaveManager {
    dir: PathBuf,
}

impl SaveManager {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File of `save_id`. Ids name a file directly inside the save
    /// directory, so separators and parent references are rejected.
    fn path_for(&self, save_id: &str) -> Result<PathBuf, PersistenceError> {
        if save_id.is_empty() || save_id.contains(&['/', '\\'][..]) || save_id.contains("..") {
            return Err(PersistenceError::InvalidSaveId(save_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", save_id)))
    }

    /// Fresh id for `name`; a numeric suffix avoids clobbering a slot
    /// created in the same second under the same name
    fn make_id(&self, name: &str) -> String {
        let base = format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), slugify(name));
        let mut id = base.clone();
        let mut n = 2;
        while self.dir.join(format!("{}.json", id)).exists() {
            id = format!("{}_{}", base, n);
            n += 1;
        }
        id
    }

    fn write(&self, file: &SaveFile) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(file)?;
        fs::write(self.path_for(&file.meta.save_id)?, json)?;
        Ok(())
    }

    fn read(&self, save_id: &str) -> Result<SaveFile, PersistenceError> {
        let path = self.path_for(save_id)?;
        if !path.exists() {
            return Err(PersistenceError::SlotNotFound(save_id.to_string()));
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Create a new slot, returning its id
    pub fn save(&self, name: &str, meta: SaveMeta, state: EcosystemSnapshot) -> Result<String, PersistenceError> {
        let save_id = self.make_id(name);
        let file = SaveFile {
            version: SAVE_VERSION,
            meta: SaveMeta {
                save_id: save_id.clone(),
                save_name: name.to_string(),
                saved_at: timestamp(),
                ..meta
            },
            state,
        };
        self.write(&file)?;
        info!("Saved '{}' as {}", name, save_id);
        Ok(save_id)
    }

    /// Metadata of every readable slot, newest first. Unreadable files
    /// are skipped.
    pub fn list(&self) -> Result<Vec<SaveMeta>, PersistenceError> {
        let mut items = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(PersistenceError::from)
                .and_then(|s| serde_json::from_str::<SaveFile>(&s).map_err(PersistenceError::from));
            match parsed {
                Ok(file) => {
                    let mut meta = file.meta;
                    if meta.save_id.is_empty() {
                        meta.save_id = path
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_default();
                    }
                    if meta.save_name.is_empty() {
                        meta.save_name = meta.save_id.clone();
                    }
                    items.push(meta);
                }
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }

        items.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then_with(|| b.save_id.cmp(&a.save_id)));
        Ok(items)
    }

    pub fn load(&self, save_id: &str) -> Result<SaveFile, PersistenceError> {
        self.read(save_id)
    }

    /// Rename a slot. The id follows the new name, so the file moves too.
    pub fn rename(&self, save_id: &str, new_name: &str) -> Result<String, PersistenceError> {
        let mut file = self.read(save_id)?;
        let new_id = self.make_id(new_name);
        file.meta.save_name = new_name.to_string();
        file.meta.save_id = new_id.clone();
        self.write(&file)?;

        if new_id != save_id {
            fs::remove_file(self.path_for(save_id)?)?;
        }
        Ok(new_id)
    }

    /// Replace the state of an existing slot in place. The id and
    /// display name are kept; the timestamp is refreshed.
    pub fn overwrite(&self, save_id: &str, meta: SaveMeta, state: EcosystemSnapshot) -> Result<(), PersistenceError> {
        let previous = self.read(save_id)?;
        let file = SaveFile {
            version: previous.version,
            meta: SaveMeta {
                save_id: save_id.to_string(),
                save_name: if previous.meta.save_name.is_empty() {
                    save_id.to_string()
                } else {
                    previous.meta.save_name
                },
                saved_at: timestamp(),
                ..meta
            },
            state,
        };
        self.write(&file)
    }

    /// Delete a slot; deleting a missing slot is not an error
    pub fn delete(&self, save_id: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(save_id)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(turn_count: u64) -> EcosystemSnapshot {
        EcosystemSnapshot {
            version: EcosystemSnapshot::VERSION,
            turn: turn_count as f64,
            turn_count,
            paused: false,
            next_id: 1,
            entities: Vec::new(),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  My   reef\tsave "), "My_reef_save");
        assert_eq!(slugify("a/b\\c:d"), "abcd");
        assert_eq!(slugify("???"), "save");
        assert_eq!(slugify("Año-1"), "Año-1");
        assert_eq!(slugify(&"x".repeat(100)).len(), 40);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveManager::new(dir.path()).unwrap();
        let meta = SaveMeta::new(12, PopulationCounts::new(3, 2, 1, 0), "calm");

        let id = saves.save("First reef", meta, state(12)).unwrap();
        assert!(id.ends_with("_First_reef"));

        let file = saves.load(&id).unwrap();
        assert_eq!(file.version, 1);
        assert_eq!(file.meta.save_name, "First reef");
        assert_eq!(file.meta.entities_total, 6);
        assert_eq!(file.state.turn_count, 12);
        assert!(!file.meta.saved_at.is_empty());
    }

    #[test]
    fn test_same_name_twice_gets_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveManager::new(dir.path()).unwrap();

        let a = saves.save("dup", SaveMeta::default(), state(1)).unwrap();
        let b = saves.save("dup", SaveMeta::default(), state(2)).unwrap();
        assert_ne!(a, b);
        assert_eq!(saves.list().unwrap().len(), 2);
    }

    #[test]
    fn test_list_newest_first_and_skips_junk() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveManager::new(dir.path()).unwrap();
        let older = SaveFile {
            version: 1,
            meta: SaveMeta {
                save_id: "old".into(),
                save_name: "Old".into(),
                saved_at: "2020-01-01T00:00:00+00:00".into(),
                ..SaveMeta::default()
            },
            state: state(1),
        };
        saves.write(&older).unwrap();
        let newer = saves.save("New", SaveMeta::default(), state(2)).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let listed: Vec<String> = saves.list().unwrap().into_iter().map(|m| m.save_id).collect();
        assert_eq!(listed, vec![newer, "old".to_string()]);
    }

    #[test]
    fn test_rename_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveManager::new(dir.path()).unwrap();
        let id = saves.save("before", SaveMeta::default(), state(5)).unwrap();

        let renamed = saves.rename(&id, "after").unwrap();
        assert!(renamed.ends_with("_after"));
        assert!(matches!(saves.load(&id), Err(PersistenceError::SlotNotFound(_))));
        let file = saves.load(&renamed).unwrap();
        assert_eq!(file.meta.save_name, "after");
        assert_eq!(file.state.turn_count, 5);
    }

    #[test]
    fn test_overwrite_keeps_identity() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveManager::new(dir.path()).unwrap();
        let id = saves.save("slot", SaveMeta::default(), state(1)).unwrap();

        saves
            .overwrite(&id, SaveMeta::new(99, PopulationCounts::default(), "later"), state(99))
            .unwrap();
        let file = saves.load(&id).unwrap();
        assert_eq!(file.meta.save_id, id);
        assert_eq!(file.meta.save_name, "slot");
        assert_eq!(file.meta.cycle, 99);
        assert_eq!(file.state.turn_count, 99);

        assert!(matches!(
            saves.overwrite("missing", SaveMeta::default(), state(0)),
            Err(PersistenceError::SlotNotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveManager::new(dir.path()).unwrap();
        let id = saves.save("gone", SaveMeta::default(), state(0)).unwrap();

        saves.delete(&id).unwrap();
        saves.delete(&id).unwrap();
        assert!(saves.list().unwrap().is_empty());
    }

    #[test]
    fn test_ids_cannot_leave_save_dir() {
        let root = tempfile::tempdir().unwrap();
        let saves = SaveManager::new(root.path().join("saves")).unwrap();
        let outside = root.path().join("outside.json");
        fs::write(&outside, "{}").unwrap();

        for bad in ["../outside", "a/b", "a\\b", "..", ""] {
            assert!(matches!(saves.delete(bad), Err(PersistenceError::InvalidSaveId(_))));
            assert!(matches!(saves.load(bad), Err(PersistenceError::InvalidSaveId(_))));
            assert!(matches!(
                saves.overwrite(bad, SaveMeta::default(), state(0)),
                Err(PersistenceError::InvalidSaveId(_))
            ));
        }
        assert!(outside.exists());
    }
}
