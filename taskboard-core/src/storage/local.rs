/// Local filesystem storage backend.
///
/// One file per key inside a directory:
/// - key names percent-encoded into `<key>.json` file names
/// - atomic writes (write to .tmp, fsync, rename, fsync directory)
/// - a write mutex so concurrent `set` calls on one instance serialize
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::{KeyValueStorage, StorageError};

/// Everything except ASCII alphanumerics, `-` and `_` is encoded, so `.`
/// and path separators can never escape the storage directory.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

pub struct FileStorage {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for_key(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let encoded = utf8_percent_encode(key, KEY_ENCODE_SET).to_string();
        Ok(self.dir.join(format!("{}.json", encoded)))
    }

    /// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
    /// Refuses to write empty content over a non-empty file.
    fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
        if content.trim().is_empty() {
            if let Ok(existing) = fs::read_to_string(path) {
                if !existing.trim().is_empty() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "Refusing to overwrite non-empty file with empty content",
                    ));
                }
            }
        }

        let tmp_path = path.with_extension("taskboard.tmp");
        if let Err(e) = Self::write_and_rename(&tmp_path, path, content) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Some(dir) = path.parent() {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    }

    fn write_and_rename(tmp_path: &Path, path: &Path, content: &str) -> Result<(), std::io::Error> {
        let mut file = fs::File::create(tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(tmp_path, path)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for_key(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for_key(key)?;
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        Self::atomic_write(&path, value).map_err(|e| {
            log::warn!(
                "[taskboard.storage.file] Failed to write {:?}: {}",
                path,
                e
            );
            StorageError::from(e)
        })
    }
}
