//! Credential storage for paired devices.
//!
//! Each paired device has one [`PairingRecord`]: its pre-shared key (hex)
//! and the send counter. The counter only ever moves forward for a given
//! key; saving a new key starts it again at 0.
//!
//! `advance` is the one operation with a concurrency contract: concurrent
//! callers for the same device are linearized, even across processes for
//! the file store, and a value is only returned after the incremented
//! counter is durably stored. The key comes back from the same locked read
//! as the counter, so a re-pair can never pair a new counter with an old key.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use trigger_types::{DeviceId, KeyError, PresharedKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record for the device.
    #[error("no pairing for device {device_id}")]
    NotFound {
        /// The device that was looked up.
        device_id: DeviceId,
    },

    /// Reading or writing a record failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A stored record could not be decoded.
    #[error("corrupt pairing record {path}: {reason}")]
    Corrupt {
        /// File holding the record.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The 64-bit counter cannot advance any further.
    #[error("send counter exhausted for device {device_id}; re-pair to continue")]
    CounterExhausted {
        /// The device whose counter overflowed.
        device_id: DeviceId,
    },

    /// The stored key is not usable hex. Nothing was advanced.
    #[error("stored key for device {device_id} is unusable: {source}")]
    InvalidKey {
        /// The device whose record holds the key.
        device_id: DeviceId,
        /// Why the key failed to decode.
        source: KeyError,
    },

    /// The backend refused the write.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable pairing state for one remote device.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PairingRecord {
    /// The remote device.
    #[zeroize(skip)]
    pub device_id: DeviceId,
    /// Pre-shared key, lowercase hex.
    pub preshared_key_hex: String,
    /// Last counter value handed out (0 = none yet).
    pub send_counter: u64,
}

impl PairingRecord {
    /// A fresh record with `send_counter = 0`.
    pub fn new(device_id: &DeviceId, key: &PresharedKey) -> Self {
        Self {
            device_id: device_id.clone(),
            preshared_key_hex: key.to_hex(),
            send_counter: 0,
        }
    }

    /// Decode the stored key.
    pub fn preshared_key(&self) -> Result<PresharedKey, KeyError> {
        PresharedKey::from_hex(&self.preshared_key_hex)
    }

    /// Bump the counter in place. On error the record is unchanged.
    pub(crate) fn advance(&mut self) -> Result<(u64, PresharedKey), StoreError> {
        let key = self
            .preshared_key()
            .map_err(|source| StoreError::InvalidKey {
                device_id: self.device_id.clone(),
                source,
            })?;
        let next = self
            .send_counter
            .checked_add(1)
            .ok_or_else(|| StoreError::CounterExhausted {
                device_id: self.device_id.clone(),
            })?;
        self.send_counter = next;
        Ok((next, key))
    }
}

impl fmt::Debug for PairingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingRecord")
            .field("device_id", &self.device_id)
            .field("preshared_key_hex", &"[REDACTED]")
            .field("send_counter", &self.send_counter)
            .finish()
    }
}

/// Trait for credential storage backends.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create or overwrite the record for `device_id` with `send_counter = 0`.
    ///
    /// Counters issued under a previous key for this id become meaningless.
    async fn save(&self, device_id: &DeviceId, key: &PresharedKey)
        -> Result<PairingRecord, StoreError>;

    /// Get the record for a device.
    ///
    /// Returns `NotFound` if the device was never paired or was cleared.
    async fn get(&self, device_id: &DeviceId) -> Result<PairingRecord, StoreError>;

    /// Atomically increment and persist the counter, returning the new value
    /// and the key it was issued under.
    ///
    /// Two concurrent callers never see the same value. A record whose key
    /// does not decode fails with `InvalidKey` before the counter moves. If
    /// this returns an error the caller must assume nothing was persisted.
    async fn advance(&self, device_id: &DeviceId) -> Result<(u64, PresharedKey), StoreError>;

    /// Like [`advance`](Self::advance), returning only the new counter.
    async fn next_counter(&self, device_id: &DeviceId) -> Result<u64, StoreError> {
        let (counter, _key) = self.advance(device_id).await?;
        Ok(counter)
    }

    /// Delete the record for a device.
    ///
    /// Returns `Ok(true)` if removed, `Ok(false)` if not found.
    async fn clear(&self, device_id: &DeviceId) -> Result<bool, StoreError>;

    /// Delete every record. Returns how many were removed.
    async fn clear_all(&self) -> Result<usize, StoreError>;

    /// Paired device ids, sorted.
    async fn list(&self) -> Result<Vec<DeviceId>, StoreError>;
}
