//! Receiver-side beacon verification.
//!
//! Holds one `(key, ReplayGuard)` entry per paired sender and applies the
//! checks a listener performs on every beacon, in order: known sender,
//! known opcode, genuine tag, fresh counter. State only advances when all
//! checks pass, so forged or replayed beacons never move `last_seen`.

use std::collections::HashMap;

use thiserror::Error;
use trigger_types::{DeviceId, Payload, PresharedKey, WireError};

use crate::codec::{self, CodecError};
use crate::replay::{ReplayError, ReplayGuard, DEFAULT_WINDOW};

/// Verification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// No key registered for the sender.
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),

    /// The frame itself is malformed.
    #[error("malformed beacon: {0}")]
    Wire(#[from] WireError),

    /// The authenticator does not match.
    #[error("invalid signature: {0}")]
    Codec(#[from] CodecError),

    /// The counter is not fresh.
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

#[derive(Debug, Clone)]
struct Trusted {
    key: PresharedKey,
    guard: ReplayGuard,
}

/// Table of trusted senders.
#[derive(Debug, Clone)]
pub struct BeaconVerifier {
    devices: HashMap<DeviceId, Trusted>,
    window: u32,
}

impl BeaconVerifier {
    /// Create an empty verifier with the default forward window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Create an empty verifier with a custom forward window.
    pub fn with_window(window: u32) -> Self {
        Self {
            devices: HashMap::new(),
            window,
        }
    }

    /// Trust a sender. Re-registering replaces the key and resets `last_seen`.
    pub fn register(&mut self, device_id: DeviceId, key: PresharedKey) {
        self.register_with_last_seen(device_id, key, 0);
    }

    /// Trust a sender, resuming from a persisted `last_seen`.
    pub fn register_with_last_seen(&mut self, device_id: DeviceId, key: PresharedKey, last_seen: u32) {
        let guard = ReplayGuard::resume(last_seen).with_window(self.window);
        self.devices.insert(device_id, Trusted { key, guard });
    }

    /// Stop trusting a sender.
    pub fn remove(&mut self, device_id: &DeviceId) -> bool {
        self.devices.remove(device_id).is_some()
    }

    /// Last accepted wire counter for a sender.
    pub fn last_seen(&self, device_id: &DeviceId) -> Option<u32> {
        self.devices.get(device_id).map(|t| t.guard.last_seen())
    }

    /// Number of trusted senders.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if no senders are trusted.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Verify a beacon from `device_id` and return its accepted wire counter.
    pub fn verify(&mut self, device_id: &DeviceId, payload: &Payload) -> Result<u32, VerifyError> {
        let trusted = self
            .devices
            .get_mut(device_id)
            .ok_or_else(|| VerifyError::UnknownDevice(device_id.clone()))?;

        payload.opcode()?;

        let counter = codec::authenticate(payload, trusted.key.as_bytes())?;
        trusted.guard.accept(counter)?;
        Ok(counter)
    }
}

impl Default for BeaconVerifier {
    fn default() -> Self {
        Self::new()
    }
}
