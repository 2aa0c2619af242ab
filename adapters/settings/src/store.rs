//! Key/value preference stores.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::SettingsError;

/// Value persisted under a preference key.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    /// Boolean flag.
    Bool(bool),
    /// Floating point setting.
    Float(f32),
}

/// Persistent player preferences addressed by string keys.
pub trait PreferenceStore {
    /// Float stored under `key`, if any.
    fn float(&self, key: &str) -> Option<f32>;

    /// Stores a float under `key`.
    fn set_float(&mut self, key: &str, value: f32);

    /// Boolean stored under `key`, if any.
    fn bool(&self, key: &str) -> Option<bool>;

    /// Stores a boolean under `key`.
    fn set_bool(&mut self, key: &str, value: bool);
}

fn float_in(values: &BTreeMap<String, PreferenceValue>, key: &str) -> Option<f32> {
    match values.get(key)? {
        PreferenceValue::Float(value) => Some(*value),
        PreferenceValue::Bool(_) => {
            log::debug!("preference {key} holds a flag, not a number");
            None
        }
    }
}

fn bool_in(values: &BTreeMap<String, PreferenceValue>, key: &str) -> Option<bool> {
    match values.get(key)? {
        PreferenceValue::Bool(value) => Some(*value),
        PreferenceValue::Float(_) => {
            log::debug!("preference {key} holds a number, not a flag");
            None
        }
    }
}

/// Preferences held in memory for the lifetime of the process.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryPreferences {
    values: BTreeMap<String, PreferenceValue>,
}

impl MemoryPreferences {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn float(&self, key: &str) -> Option<f32> {
        float_in(&self.values, key)
    }

    fn set_float(&mut self, key: &str, value: f32) {
        let _ = self
            .values
            .insert(key.to_owned(), PreferenceValue::Float(value));
    }

    fn bool(&self, key: &str) -> Option<bool> {
        bool_in(&self.values, key)
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        let _ = self
            .values
            .insert(key.to_owned(), PreferenceValue::Bool(value));
    }
}

/// Preferences backed by a flat TOML table on disk.
///
/// Writes stay in memory until [`TomlPreferences::save`] is called.
#[derive(Clone, Debug, PartialEq)]
pub struct TomlPreferences {
    path: PathBuf,
    values: BTreeMap<String, PreferenceValue>,
}

impl TomlPreferences {
    /// Loads preferences from `path`; a missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                log::debug!("no preferences at {}; starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        Ok(Self { path, values })
    }

    /// Location the preferences are read from and saved to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes every preference back to disk.
    pub fn save(&self) -> Result<(), SettingsError> {
        let text = toml::to_string(&self.values)?;
        fs::write(&self.path, text).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl PreferenceStore for TomlPreferences {
    fn float(&self, key: &str) -> Option<f32> {
        float_in(&self.values, key)
    }

    fn set_float(&mut self, key: &str, value: f32) {
        let _ = self
            .values
            .insert(key.to_owned(), PreferenceValue::Float(value));
    }

    fn bool(&self, key: &str) -> Option<bool> {
        bool_in(&self.values, key)
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        let _ = self
            .values
            .insert(key.to_owned(), PreferenceValue::Bool(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_types_read_as_missing() {
        let mut store = MemoryPreferences::new();
        store.set_bool("muted", true);
        store.set_float("volume", 0.5);
        assert_eq!(store.float("muted"), None);
        assert_eq!(store.bool("volume"), None);
        assert_eq!(store.bool("muted"), Some(true));
    }

    #[test]
    fn integers_parse_as_floats() {
        let values: BTreeMap<String, PreferenceValue> =
            toml::from_str("volume = 1\nmuted = false\n").expect("parse");
        assert_eq!(values.get("volume"), Some(&PreferenceValue::Float(1.0)));
        assert_eq!(values.get("muted"), Some(&PreferenceValue::Bool(false)));
    }
}
