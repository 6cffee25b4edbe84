//! Key-value persistence for tracker data.
//!
//! Stores hold opaque bytes under a logical key. Records are JSON; the
//! file store can seal them with a passphrase before they reach disk.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::crypto::{self, KdfParams, Passphrase};

/// Key under which the cycle record is kept.
pub const PERIOD_DATA_KEY: &str = "period_data";

const PLAIN_EXT: &str = "json";
const SEALED_EXT: &str = "femcare";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("data directory not found")]
    NoDataDir,
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("{0:?} is encrypted and no passphrase was given")]
    Locked(String),
    #[error("store poisoned")]
    Poisoned,
}

pub trait RecordStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Load and decode a JSON value, `None` if nothing is stored under `key`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn RecordStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.read(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize>(
    store: &dyn RecordStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_vec(value)?;
    store.write(key, &json)
}

/// Volatile store, used by tests and one-shot sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// One file per key inside a data directory. With a passphrase every value
/// is sealed before it is written.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    sealing: Option<(Passphrase, KdfParams)>,
}

impl FileStore {
    pub fn plain(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sealing: None,
        }
    }

    pub fn encrypted(dir: impl Into<PathBuf>, passphrase: Passphrase, params: KdfParams) -> Self {
        Self {
            dir: dir.into(),
            sealing: Some((passphrase, params)),
        }
    }

    /// Default per-user data directory.
    pub fn default_dir() -> Result<PathBuf, StorageError> {
        Ok(dirs::data_local_dir()
            .ok_or(StorageError::NoDataDir)?
            .join("femcare"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let ext = if self.sealing.is_some() { SEALED_EXT } else { PLAIN_EXT };
        self.path_with_ext(key, ext)
    }

    fn path_with_ext(&self, key: &str, ext: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{ext}")))
    }
}

impl RecordStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            if self.sealing.is_none() && self.path_with_ext(key, SEALED_EXT)?.exists() {
                return Err(StorageError::Locked(key.to_string()));
            }
            tracing::debug!(path = %path.display(), "no stored value");
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        match &self.sealing {
            Some((passphrase, _)) => Ok(Some(crypto::open(passphrase, &bytes)?)),
            None if crypto::is_sealed(&bytes) => Err(StorageError::Locked(key.to_string())),
            None => Ok(Some(bytes)),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        let payload = match &self.sealing {
            Some((passphrase, params)) => crypto::seal(passphrase, *params, bytes)?,
            None => bytes.to_vec(),
        };

        // Write beside the target and rename so a crash never leaves a
        // half-written record.
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(&payload)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| StorageError::Io(e.error))?;

        tracing::debug!(path = %path.display(), bytes = payload.len(), "stored value");
        Ok(())
    }

    /// Removes both the plain and the sealed file for `key`, whichever mode
    /// this store is in. Nothing is read or decrypted.
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        for ext in [PLAIN_EXT, SEALED_EXT] {
            let path = self.path_with_ext(key, ext)?;
            if path.exists() {
                fs::remove_file(&path)?;
                tracing::info!(path = %path.display(), "removed stored value");
            }
        }
        Ok(())
    }
}
