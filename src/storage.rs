use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Settings, SettingsFile};

pub const TASKS_STORAGE_KEY: &str = "calendar-tasks";
pub const SETTINGS_STORAGE_KEY: &str = "calendar-settings";
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// Durable string slots addressed by a fixed key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per slot under `root`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    fn write_atomic(&self, path: PathBuf, bytes: &[u8]) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(buf))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_dirs()?;
        self.write_atomic(self.slot_path(key), value.as_bytes())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local slots; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.borrow().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

pub fn load_json<T: DeserializeOwned>(
    store: &impl KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize>(
    store: &impl KeyValueStore,
    key: &str,
    data: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(data)?;
    store.set(key, &json)
}

/// Reads settings, falling back to defaults when the slot is missing or malformed.
pub fn load_settings(store: &impl KeyValueStore) -> Settings {
    match load_json::<SettingsFile>(store, SETTINGS_STORAGE_KEY) {
        Ok(Some(file)) => file.settings,
        Ok(None) => Settings::default(),
        Err(error) => {
            log::warn!("failed loading settings, using defaults: {error}");
            Settings::default()
        }
    }
}

pub fn save_settings(store: &impl KeyValueStore, settings: &Settings) -> Result<(), StorageError> {
    let file = SettingsFile {
        schema_version: SCHEMA_VERSION,
        settings: settings.clone(),
    };
    save_json(store, SETTINGS_STORAGE_KEY, &file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TimeWindow, WeekStart};

    #[test]
    fn file_store_round_trips_and_removes_slots() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "[1,2]").unwrap();
        assert!(dir.path().join("nested").join("k.json").is_file());
        assert!(!dir.path().join("nested").join("k.tmp").exists());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[1,2]"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // Removing a missing slot is fine.
        store.remove("k").unwrap();
    }

    #[test]
    fn file_store_reports_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("root");
        fs::write(&blocker, b"x").unwrap();
        let store = FileStore::new(blocker);
        assert!(matches!(store.set("k", "v"), Err(StorageError::Io(_))));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert!(store.contains("k"));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert!(!store.contains("k"));
    }

    #[test]
    fn load_json_surfaces_parse_errors() {
        let store = MemoryStore::new();
        store.set("k", "{not json").unwrap();
        let res: Result<Option<Vec<u32>>, _> = load_json(&store, "k");
        assert!(matches!(res, Err(StorageError::Json(_))));
    }

    #[test]
    fn settings_fall_back_to_defaults_and_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(load_settings(&store), Settings::default());

        store.set(SETTINGS_STORAGE_KEY, "garbage").unwrap();
        assert_eq!(load_settings(&store), Settings::default());

        let settings = Settings {
            week_start: WeekStart::Monday,
            default_time_window: TimeWindow::TwoWeeks,
        };
        save_settings(&store, &settings).unwrap();
        assert_eq!(load_settings(&store), settings);

        let raw = store.get(SETTINGS_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schema_version"], SCHEMA_VERSION);
    }
}
