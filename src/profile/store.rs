use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::profile::types::{CaptureProfile, ProfileFile};

/// Persistent capture-profile store.
///
/// Mutations mark the store dirty; `flush` writes the file when needed.
/// The embedder decides when to flush (typically on slide change or exit).
pub struct ProfileStore {
    path: PathBuf,
    data: Mutex<ProfileFile>,
    is_dirty: AtomicBool,
}

impl ProfileStore {
    /// Create a new store, loading from disk if the file exists.
    pub fn new(path: PathBuf) -> Self {
        let data = match Self::load(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("failed to load capture profiles: {e}");
                ProfileFile::default()
            }
        };
        Self {
            path,
            data: Mutex::new(data),
            is_dirty: AtomicBool::new(false),
        }
    }

    /// Load profiles from a JSON file, returning default on missing file.
    pub fn load(path: &std::path::Path) -> Result<ProfileFile, String> {
        if !path.exists() {
            return Ok(ProfileFile::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&contents).map_err(|e| e.to_string())
    }

    /// Save current profiles to disk atomically (write .tmp then rename).
    pub fn save(&self) -> Result<(), String> {
        let data = self.data.lock().clone();
        let json = serde_json::to_string_pretty(&data).map_err(|e| e.to_string())?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(|e| e.to_string())?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Get the saved profile for a source by ID.
    pub fn get_profile(&self, source_id: &str) -> Option<CaptureProfile> {
        self.data.lock().sources.get(source_id).cloned()
    }

    /// Store a profile for a source, marking the store dirty.
    pub fn set_profile(&self, source_id: &str, profile: CaptureProfile) {
        self.data
            .lock()
            .sources
            .insert(source_id.to_string(), profile);
        self.is_dirty.store(true, Ordering::Release);
    }

    /// Remove the saved profile for a source.
    pub fn remove_profile(&self, source_id: &str) {
        self.data.lock().sources.remove(source_id);
        self.is_dirty.store(true, Ordering::Release);
    }

    /// Whether unsaved mutations exist.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    /// Save if dirty. Clears the dirty flag on success.
    pub fn flush(&self) -> Result<(), String> {
        if self.is_dirty.swap(false, Ordering::AcqRel) {
            if let Err(e) = self.save() {
                self.is_dirty.store(true, Ordering::Release);
                return Err(e);
            }
        }
        Ok(())
    }
}
