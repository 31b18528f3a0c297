//! File-backed credential store.
//!
//! One JSON file per device under a private directory:
//!
//! ```text
//! <dir>/
//!   <sha256(device_id)>.json   {"device_id", "preshared_key_hex", "send_counter"}
//!   <sha256(device_id)>.lock   advisory lock held across read-modify-write
//! ```
//!
//! File names are the hex SHA-256 of the id, so any id (MAC address, label
//! with slashes, very long strings) maps to a fixed-length safe name. The id
//! itself lives inside the record. Writes go to a uniquely named temp file
//! that is fsynced and renamed over the record, so a reader sees either the
//! old or the new record and a crash never leaves a counter that was handed
//! out unpersisted.
//!
//! Lock files are never deleted. Removing one while another process waits
//! on it would let two processes lock different inodes.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use fs4::FileExt;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use trigger_types::{DeviceId, PresharedKey};

use super::{CredentialStore, PairingRecord, StoreError};

const RECORD_EXT: &str = "json";
const LOCK_EXT: &str = "lock";

/// Durable credential store.
///
/// Every mutation of a device takes a per-device async lock, then an
/// exclusive OS lock on the device's lock file. The first keeps tasks in
/// this process from piling up on blocking threads; the second linearizes
/// store handles in other processes (or this one) sharing the directory.
pub struct FileStore {
    dir: PathBuf,
    locks: DashMap<DeviceId, Arc<Mutex<()>>>,
}

/// Exclusive access to one device's record. Closing the lock file releases
/// the OS lock.
struct DeviceGuard {
    _file: std::fs::File,
    _local: OwnedMutexGuard<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
        set_dir_permissions_0700(&dir).await?;

        debug!(dir = %dir.display(), "opened credential store");
        Ok(Self {
            dir,
            locks: DashMap::new(),
        })
    }

    /// Directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn record_path(&self, device_id: &DeviceId) -> PathBuf {
        self.dir
            .join(file_stem(device_id))
            .with_extension(RECORD_EXT)
    }

    fn lock_path(&self, device_id: &DeviceId) -> PathBuf {
        self.dir.join(file_stem(device_id)).with_extension(LOCK_EXT)
    }

    fn device_lock(&self, device_id: &DeviceId) -> Arc<Mutex<()>> {
        self.locks
            .entry(device_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // Drops the entry only when nobody holds or waits on it. Anyone who
    // races past is still serialized by the file lock.
    fn prune_lock(&self, device_id: &DeviceId) {
        self.locks
            .remove_if(device_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn lock_device(&self, device_id: &DeviceId) -> Result<DeviceGuard, StoreError> {
        let local = self.device_lock(device_id).lock_owned().await;

        let path = self.lock_path(device_id);
        let task_path = path.clone();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            let file = open_lock_file(&task_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("lock task failed: {e}")))?
        .map_err(|source| StoreError::Io { path, source })?;

        Ok(DeviceGuard {
            _file: file,
            _local: local,
        })
    }

    async fn read_record(&self, device_id: &DeviceId) -> Result<PairingRecord, StoreError> {
        let path = self.record_path(device_id);
        let contents = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    device_id: device_id.clone(),
                })
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let record: PairingRecord =
            serde_json::from_slice(&contents).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if &record.device_id != device_id {
            return Err(StoreError::Corrupt {
                path,
                reason: format!("record belongs to {}", record.device_id),
            });
        }
        Ok(record)
    }

    async fn write_record(&self, record: &PairingRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.device_id);
        let contents = serde_json::to_vec_pretty(record).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || replace_file(&dir, &path, &contents))
            .await
            .map_err(|e| StoreError::Unavailable(format!("write task failed: {e}")))?
    }

    /// The device id of a listed record, if the file is one of ours.
    async fn listed_device(&self, path: &Path) -> Option<DeviceId> {
        let contents = tokio::fs::read(path).await.ok()?;
        let record: PairingRecord = serde_json::from_slice(&contents).ok()?;
        let stem = path.file_stem()?.to_str()?;
        (stem == file_stem(&record.device_id)).then(|| record.device_id.clone())
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn save(
        &self,
        device_id: &DeviceId,
        key: &PresharedKey,
    ) -> Result<PairingRecord, StoreError> {
        let _guard = self.lock_device(device_id).await?;

        let record = PairingRecord::new(device_id, key);
        self.write_record(&record).await?;
        debug!(device = %device_id, "saved pairing record");
        Ok(record)
    }

    async fn get(&self, device_id: &DeviceId) -> Result<PairingRecord, StoreError> {
        self.read_record(device_id).await
    }

    async fn advance(&self, device_id: &DeviceId) -> Result<(u64, PresharedKey), StoreError> {
        let _guard = self.lock_device(device_id).await?;

        let mut record = self.read_record(device_id).await?;
        let (counter, key) = record.advance()?;
        self.write_record(&record).await?;

        debug!(device = %device_id, counter, "advanced send counter");
        Ok((counter, key))
    }

    async fn clear(&self, device_id: &DeviceId) -> Result<bool, StoreError> {
        let removed = {
            let _guard = self.lock_device(device_id).await?;

            let path = self.record_path(device_id);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => true,
                Err(e) if e.kind() == ErrorKind::NotFound => false,
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        };
        self.prune_lock(device_id);

        if removed {
            debug!(device = %device_id, "cleared pairing record");
        }
        Ok(removed)
    }

    async fn clear_all(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for device_id in self.list().await? {
            if self.clear(&device_id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<DeviceId>, StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            match self.listed_device(&path).await {
                Some(id) => ids.push(id),
                None => debug!(path = %path.display(), "skipping foreign file in credential store"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn file_stem(device_id: &DeviceId) -> String {
    hex::encode(Sha256::digest(device_id.as_str().as_bytes()))
}

fn open_lock_file(path: &Path) -> std::io::Result<std::fs::File> {
    let mut options = std::fs::OpenOptions::new();
    options.read(true).write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// Write `contents` to a fresh temp file in `dir` and rename it over `path`.
///
/// Temp files are created 0600 on Unix.
fn replace_file(dir: &Path, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| StoreError::Io { path, source }
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err(dir))?;
    tmp.write_all(contents).map_err(io_err(path))?;
    tmp.as_file().sync_all().map_err(io_err(path))?;
    tmp.persist(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    sync_dir(dir).map_err(io_err(dir))
}

/// Flush the rename itself to disk. No-op on non-Unix platforms.
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::fs::File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
async fn set_dir_permissions_0700(path: &Path) -> Result<(), StoreError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
