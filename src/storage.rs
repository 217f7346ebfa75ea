use crate::config::atomic_rename;
use crate::game::validate_name;
use crate::model::{SaveBlob, SAVE_KEY};
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("store i/o failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// String blobs addressed by key.
pub(crate) trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key under a directory.
pub(crate) struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(io_err(&tmp))?;
        atomic_rename(&tmp, &path).map_err(io_err(&path))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path)(e)),
        }
    }
}

/// Nothing outlives the process.
#[derive(Default)]
pub(crate) struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Read the save blob. Missing, unreadable and malformed saves all come back
/// as `None`; the latter two are logged. A started game whose pet name breaks
/// the naming rules counts as malformed.
pub(crate) fn load_save(store: &dyn KeyValueStore) -> Option<SaveBlob> {
    let raw = match store.get(SAVE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "could not read save");
            return None;
        }
    };
    match serde_json::from_str::<SaveBlob>(&raw) {
        Ok(mut blob) => {
            if blob.game_started {
                match validate_name(&blob.pet.name) {
                    Ok(name) => blob.pet.name = name,
                    Err(e) => {
                        warn!(error = %e, "ignoring save with bad pet name");
                        return None;
                    }
                }
            }
            blob.pet = blob.pet.sanitized();
            Some(blob)
        }
        Err(e) => {
            warn!(error = %e, "ignoring malformed save");
            None
        }
    }
}

/// Overwrite the save blob. Failures are logged, never raised.
pub(crate) fn write_save(store: &mut dyn KeyValueStore, blob: &SaveBlob) {
    let data = match serde_json::to_string(blob) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "could not encode save");
            return;
        }
    };
    if let Err(e) = store.set(SAVE_KEY, &data) {
        warn!(error = %e, "could not write save");
    } else {
        debug!(bytes = data.len(), "saved");
    }
}

pub(crate) fn clear_save(store: &mut dyn KeyValueStore) {
    if let Err(e) = store.remove(SAVE_KEY) {
        warn!(error = %e, "could not delete save");
    }
}
