//! Binder configuration: the persisted record plus the paths derived
//! from it.
//!
//! The record lives at `{config_root}/{name}/binder.json`, next to the
//! metadata sidecar. It is read once when the binder is constructed
//! (persisted values win over whatever the caller passed) and rewritten
//! on every save cycle.

use crate::error::{BinderError, Result};
use crate::naming::validate_name;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the persisted binder record.
pub const CONFIG_FILENAME: &str = "binder.json";
/// File name of the metadata sidecar, next to the config record.
pub const METADATA_FILENAME: &str = "metadata.json";
/// Name of the reserved trash directory inside the data directory.
pub const TRASH_DIR: &str = "Trash";
/// Name of the section every binder starts with.
pub const DEFAULT_SECTION: &str = "Default";

fn default_buffer_size() -> usize {
    64 * 1024
}

fn default_save_interval_ms() -> u64 {
    5_000
}

fn default_recents_capacity() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinderConfig {
    /// Binder name; also the name of its directory under `root`.
    pub name: String,
    /// Parent directory that holds the binder's data directory.
    pub root: PathBuf,
    /// Read-buffer hint in bytes. Advisory; whole-document reads do not
    /// consult it, but the value is carried for consumers that stream.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Milliseconds between background save sweeps.
    #[serde(default = "default_save_interval_ms")]
    pub save_interval_ms: u64,
    /// Maximum number of artifacts the recents cache holds.
    #[serde(default = "default_recents_capacity")]
    pub recents_capacity: usize,
    /// Override for the trash location. Emptying the trash refuses any
    /// value that is not the `Trash` directory inside the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_trash_dir: Option<PathBuf>,
    /// Directory holding `binder.json` and `metadata.json`. Derived from
    /// where the record was loaded, never persisted inside it.
    #[serde(skip)]
    pub config_dir: PathBuf,
}

impl BinderConfig {
    /// Build a config for the binder `name` under `root`, with its record
    /// kept under `config_root/{name}/`. The name is validated against
    /// the same character set as artifact names.
    pub fn new(name: &str, root: &Path, config_root: &Path) -> Result<Self> {
        validate_name("binder name", name)?;
        Ok(Self {
            name: name.to_string(),
            root: root.to_path_buf(),
            buffer_size: default_buffer_size(),
            save_interval_ms: default_save_interval_ms(),
            recents_capacity: default_recents_capacity(),
            custom_trash_dir: None,
            config_dir: config_root.join(name),
        })
    }

    /// Per-user default config root (`~/.config/bindery` on Linux).
    pub fn default_config_root() -> Option<PathBuf> {
        ProjectDirs::from("", "", "bindery").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// The binder's own directory: `{root}/{name}`.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// Where trashed artifacts live.
    pub fn trash_dir(&self) -> PathBuf {
        self.custom_trash_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join(TRASH_DIR))
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILENAME)
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.config_dir.join(METADATA_FILENAME)
    }

    /// Parse a persisted record. Malformed or incomplete JSON is a
    /// configuration error, not a serialization one: the binder cannot
    /// come up without a usable record.
    pub(crate) fn from_json(raw: &str, config_dir: &Path) -> Result<Self> {
        let mut config: BinderConfig = serde_json::from_str(raw)
            .map_err(|err| BinderError::Config(format!("unusable binder config: {}", err)))?;
        validate_name("binder name", &config.name)?;
        config.config_dir = config_dir.to_path_buf();
        Ok(config)
    }

    pub(crate) fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BinderConfig {
        BinderConfig::new("Notes", Path::new("/data"), Path::new("/conf")).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.buffer_size, 64 * 1024);
        assert_eq!(config.save_interval_ms, 5_000);
        assert_eq!(config.recents_capacity, 5);
        assert!(config.custom_trash_dir.is_none());
    }

    #[test]
    fn test_derived_paths() {
        let config = config();
        assert_eq!(config.data_dir(), PathBuf::from("/data/Notes"));
        assert_eq!(config.trash_dir(), PathBuf::from("/data/Notes/Trash"));
        assert_eq!(config.config_file(), PathBuf::from("/conf/Notes/binder.json"));
        assert_eq!(
            config.metadata_file(),
            PathBuf::from("/conf/Notes/metadata.json")
        );
    }

    #[test]
    fn test_invalid_binder_name() {
        let err = BinderConfig::new("bad/name", Path::new("/d"), Path::new("/c")).unwrap_err();
        assert!(matches!(
            err,
            BinderError::InvalidName {
                field: "binder name",
                ..
            }
        ));
    }

    #[test]
    fn test_round_trip_with_custom_trash() {
        let mut config = config();
        config.custom_trash_dir = Some(PathBuf::from("/elsewhere/Bin"));
        config.save_interval_ms = 250;

        let raw = config.to_json().unwrap();
        let restored = BinderConfig::from_json(&raw, Path::new("/conf/Notes")).unwrap();
        assert_eq!(restored.name, "Notes");
        assert_eq!(restored.save_interval_ms, 250);
        assert_eq!(restored.trash_dir(), PathBuf::from("/elsewhere/Bin"));
        assert_eq!(restored.config_dir, PathBuf::from("/conf/Notes"));
    }

    #[test]
    fn test_missing_optional_fields_fall_back_to_defaults() {
        let raw = r#"{ "name": "Notes", "root": "/data" }"#;
        let config = BinderConfig::from_json(raw, Path::new("/conf/Notes")).unwrap();
        assert_eq!(config.save_interval_ms, 5_000);
        assert_eq!(config.recents_capacity, 5);
        assert_eq!(config.buffer_size, 64 * 1024);
    }

    #[test]
    fn test_missing_required_fields_is_config_error() {
        let raw = r#"{ "root": "/data" }"#;
        let err = BinderConfig::from_json(raw, Path::new("/conf/Notes")).unwrap_err();
        assert!(matches!(err, BinderError::Config(_)));

        let err = BinderConfig::from_json("not json", Path::new("/conf/Notes")).unwrap_err();
        assert!(matches!(err, BinderError::Config(_)));
    }
}
