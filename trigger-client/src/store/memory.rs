//! In-memory credential store.
//!
//! Stores records in a thread-safe HashMap. Not persistent - all pairings
//! are lost when the store is dropped. Used for tests and for hosts that
//! bring their own persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use trigger_types::{DeviceId, PresharedKey};

use super::{CredentialStore, PairingRecord, StoreError};

/// In-memory credential store.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    records: HashMap<DeviceId, PairingRecord>,
    fail_next_write: Option<String>,
}

impl MemoryStoreInner {
    fn take_failure(&mut self) -> Result<(), StoreError> {
        match self.fail_next_write.take() {
            Some(reason) => Err(StoreError::Unavailable(reason)),
            None => Ok(()),
        }
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of paired devices.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    /// Check if no devices are paired.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().records.is_empty()
    }

    /// Cause the next `save` or `advance` to fail without mutating.
    pub fn fail_next_write(&self, reason: &str) {
        self.inner.lock().unwrap().fail_next_write = Some(reason.to_string());
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn save(
        &self,
        device_id: &DeviceId,
        key: &PresharedKey,
    ) -> Result<PairingRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;

        let record = PairingRecord::new(device_id, key);
        inner.records.insert(device_id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, device_id: &DeviceId) -> Result<PairingRecord, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .records
            .get(device_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                device_id: device_id.clone(),
            })
    }

    async fn advance(&self, device_id: &DeviceId) -> Result<(u64, PresharedKey), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.records.contains_key(device_id) {
            return Err(StoreError::NotFound {
                device_id: device_id.clone(),
            });
        }
        inner.take_failure()?;

        inner
            .records
            .get_mut(device_id)
            .ok_or_else(|| StoreError::NotFound {
                device_id: device_id.clone(),
            })?
            .advance()
    }

    async fn clear(&self, device_id: &DeviceId) -> Result<bool, StoreError> {
        Ok(self.inner.lock().unwrap().records.remove(device_id).is_some())
    }

    async fn clear_all(&self) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let removed = inner.records.len();
        inner.records.clear();
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<DeviceId>, StoreError> {
        let mut ids: Vec<DeviceId> = self.inner.lock().unwrap().records.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
