// File-backed store for the selected location
use crate::application::upstream_repository::LocationRepository;
use crate::domain::coordinate::SelectedLocation;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static SAVE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("could not access {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("could not encode preference: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing, unreadable or corrupt file all read as no selection.
    pub fn load(&self) -> Option<SelectedLocation> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Ignoring unreadable preference: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(location) => Some(location),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Ignoring corrupt preference: {}", e);
                None
            }
        }
    }

    /// Write through a sibling temp file so readers never see a partial file.
    /// Each save gets its own temp name; the last rename wins.
    pub fn save(&self, location: &SelectedLocation) -> Result<(), PreferenceError> {
        let io_err = |source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let encoded = serde_json::to_vec_pretty(location)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(
            ".{}.{}.tmp",
            std::process::id(),
            SAVE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, encoded).map_err(io_err)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(e));
        }
        Ok(())
    }
}

impl LocationRepository for PreferenceStore {
    fn load(&self) -> Option<SelectedLocation> {
        PreferenceStore::load(self)
    }

    fn save(&self, location: &SelectedLocation) -> anyhow::Result<()> {
        Ok(PreferenceStore::save(self, location)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toronto() -> SelectedLocation {
        SelectedLocation {
            city: "Toronto".to_string(),
            country: "Canada".to_string(),
            lat: 43.6532,
            lng: -79.3832,
        }
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("location.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_creates_directories_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("nested/state/location.json"));

        store.save(&toronto()).unwrap();
        assert_eq!(store.load(), Some(toronto()));
        let leftovers = std::fs::read_dir(dir.path().join("nested/state")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_concurrent_saves_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("location.json"));

        let cities = ["Toronto", "Denver", "Houston", "Montreal", "Seattle", "Miami", "Boston", "Phoenix"];
        std::thread::scope(|scope| {
            let handles: Vec<_> = cities
                .iter()
                .map(|city| {
                    let store = &store;
                    scope.spawn(move || {
                        for _ in 0..10 {
                            store
                                .save(&SelectedLocation {
                                    city: city.to_string(),
                                    ..toronto()
                                })
                                .unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });

        let saved = store.load().unwrap();
        assert!(cities.contains(&saved.city.as_str()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("location.json");
        std::fs::write(&path, "{\"city\": \"Toron").unwrap();

        let store = PreferenceStore::new(&path);
        assert!(store.load().is_none());

        // A later save replaces the corrupt file
        store.save(&toronto()).unwrap();
        assert_eq!(store.load(), Some(toronto()));
    }

    #[test]
    fn test_wrong_shape_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("location.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(PreferenceStore::new(path).load().is_none());
    }
}
