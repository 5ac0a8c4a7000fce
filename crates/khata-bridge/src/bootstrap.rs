//! # Bootstrap Flag Store
//!
//! A small JSON-file key-value store for non-relational bootstrap state;
//! currently just the first-run flag. This is the counterpart of the app
//! shell's configuration store: it lives next to the database file in the
//! per-user application-data directory, not inside the relational schema.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use khata_db::seed::BootstrapFlags;

const FIRST_RUN_KEY: &str = "firstRun";

/// File-backed implementation of [`BootstrapFlags`].
///
/// A missing or unreadable-as-JSON file behaves as a fresh install
/// (`firstRun = true`); every mutation rewrites the whole file.
#[derive(Debug)]
pub struct FileBootstrapFlags {
    path: PathBuf,
    values: Map<String, Value>,
}

impl FileBootstrapFlags {
    /// Loads the store from `path`, tolerating a missing file.
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();

        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<Value>(&contents)
                .ok()
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e),
        };

        debug!(path = %path.display(), keys = values.len(), "Bootstrap store loaded");
        Ok(FileBootstrapFlags { path, values })
    }

    /// The file this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&Value::Object(self.values.clone()))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, contents)
    }
}

impl BootstrapFlags for FileBootstrapFlags {
    fn first_run(&self) -> bool {
        self.values
            .get(FIRST_RUN_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    fn set_first_run(&mut self, value: bool) -> io::Result<()> {
        self.values
            .insert(FIRST_RUN_KEY.to_string(), Value::Bool(value));
        self.persist()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_means_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBootstrapFlags::load(dir.path().join("bootstrap.json")).unwrap();

        assert!(store.first_run());
    }

    #[test]
    fn test_flag_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bootstrap.json");

        let mut store = FileBootstrapFlags::load(&path).unwrap();
        store.set_first_run(false).unwrap();

        let reloaded = FileBootstrapFlags::load(&path).unwrap();
        assert!(!reloaded.first_run());
    }

    #[test]
    fn test_corrupt_file_degrades_to_fresh_install() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bootstrap.json");
        fs::write(&path, "not json at all").unwrap();

        let store = FileBootstrapFlags::load(&path).unwrap();
        assert!(store.first_run());
    }
}
