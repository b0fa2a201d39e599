use crate::error::PreferenceError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// File name used for saved filter preferences
pub const FILTER_PREFERENCES_FILE: &str = "property-filters.json";

/// Abstract interface for the saved filter preference blob.
///
/// The blob is opaque JSON; parsing it is the synchronizer's job so that a
/// corrupt entry and a failing backend are handled in one place.
pub trait PreferenceStore: Send + Sync {
    /// Raw saved entry. `Ok(None)` when nothing is stored.
    fn get(&self) -> Result<Option<String>, PreferenceError>;

    /// Replace the saved entry
    fn set(&self, value: &str) -> Result<(), PreferenceError>;

    /// Remove the saved entry. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), PreferenceError>;
}

/// In-memory preference store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryPreferenceStore {
    value: Mutex<Option<String>>,
    simulate_error: AtomicBool,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: &str) -> Self {
        Self {
            value: Mutex::new(Some(value.to_string())),
            simulate_error: AtomicBool::new(false),
        }
    }

    /// Make every call fail, for exercising error recovery
    pub fn set_simulate_error(&self, simulate: bool) {
        self.simulate_error.store(simulate, Ordering::SeqCst);
    }

    /// Current entry, bypassing error simulation
    pub fn snapshot(&self) -> Option<String> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn check(&self) -> Result<(), PreferenceError> {
        if self.simulate_error.load(Ordering::SeqCst) {
            return Err(PreferenceError::Unavailable("Simulated storage error".to_string()));
        }
        Ok(())
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self) -> Result<Option<String>, PreferenceError> {
        self.check()?;
        Ok(self.snapshot())
    }

    fn set(&self, value: &str) -> Result<(), PreferenceError> {
        self.check()?;
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), PreferenceError> {
        self.check()?;
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Preference store persisting the blob in a single file
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PreferenceError {
        PreferenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self) -> Result<Option<String>, PreferenceError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn set(&self, value: &str) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        // Write then rename so a crash never leaves a half-written entry
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), PreferenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryPreferenceStore::new();
        assert_eq!(store.get().unwrap(), None);

        store.set(r#"{"search":"lake"}"#).unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some(r#"{"search":"lake"}"#));

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn memory_store_simulated_failure() {
        let store = MemoryPreferenceStore::with_value("{}");
        store.set_simulate_error(true);
        assert!(store.get().is_err());
        assert!(store.set("{}").is_err());
        assert_eq!(store.snapshot().as_deref(), Some("{}"));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path().join("nested").join(FILTER_PREFERENCES_FILE));

        assert_eq!(store.get().unwrap(), None);
        store.set(r#"{"status":"HIDDEN"}"#).unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some(r#"{"status":"HIDDEN"}"#));

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn file_store_reports_unreadable_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be
        let store = FilePreferenceStore::new(dir.path());
        assert!(matches!(store.get(), Err(PreferenceError::Io { .. })));
    }
}
