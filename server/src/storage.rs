//! Flat-file object storage: one file per backing-object key under
//! `data_dir`, plus an in-memory advisory lock table. Generalizes the
//! teacher's `handlers.rs`, which did the same thing against a fixed
//! `data/` directory with no offset/length support and no locking.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct Store {
    data_dir: PathBuf,
    locks: Mutex<HashMap<String, bool>>,
}

#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Io(std::io::Error),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Object keys never contain `/` (they're `<logical key>$<segment>`), so a
/// flat directory of files named after the key is sufficient.
fn object_path(data_dir: &Path, key: &str) -> PathBuf {
    data_dir.join(key)
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn read(&self, key: &str, offset: u64, length: usize) -> Result<Vec<u8>, StoreError> {
        let path = object_path(&self.data_dir, key);
        let mut file = std::fs::File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound,
            _ => StoreError::Io(e),
        })?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length];
        let n = file.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    pub fn write(&self, key: &str, offset: u64, data: &[u8]) -> Result<usize, StoreError> {
        let path = object_path(&self.data_dir, key);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(data.len())
    }

    pub fn exists(&self, key: &str) -> bool {
        object_path(&self.data_dir, key).exists()
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(object_path(&self.data_dir, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Collapses holder/cookie/tag to the object key itself, mirroring
    /// the original's `ioctx.lock_shared(obj_key, obj_key, obj_key, ...)`
    /// call with five identical arguments: one object, one lock.
    pub fn lock(&self, key: &str, exclusive: bool) -> bool {
        let mut locks = self.locks.lock().unwrap();
        if locks.contains_key(key) {
            return false;
        }
        locks.insert(key.to_string(), exclusive);
        true
    }

    pub fn unlock(&self, key: &str) {
        self.locks.lock().unwrap().remove(key);
    }
}
