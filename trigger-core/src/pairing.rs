//! Pairing payload parsing.
//!
//! The pairing server shows the credential as a QR code (or the user types
//! it in) in one of two forms:
//!
//! - `deviceId|presharedKeyHex`
//! - `serverUrl|deviceId|presharedKeyHex`
//!
//! The three-field form asks the client to register with `serverUrl` before
//! the credential is saved; that HTTP exchange lives outside this crate.
//! The key is decoded here so a malformed key is rejected before anything
//! touches the credential store.

use thiserror::Error;
use trigger_types::{DeviceId, IdError, KeyError, PresharedKey};

const SEPARATOR: char = '|';

/// Error type for pairing payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingError {
    /// Wrong number of `|`-separated fields.
    #[error("expected 2 or 3 fields separated by '|', got {0}")]
    FieldCount(usize),

    /// A field is empty.
    #[error("pairing field `{0}` is empty")]
    EmptyField(&'static str),

    /// The device id is not acceptable.
    #[error("invalid device id: {0}")]
    DeviceId(#[from] IdError),

    /// The key is not even-length hex.
    #[error("invalid key format: {0}")]
    InvalidKey(#[from] KeyError),
}

/// A parsed pairing payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingInput {
    /// Registration endpoint, present in the three-field form.
    pub server_url: Option<String>,
    /// The remote device.
    pub device_id: DeviceId,
    /// The pre-shared key.
    pub key: PresharedKey,
}

impl PairingInput {
    /// Create a two-field pairing.
    pub fn new(device_id: DeviceId, key: PresharedKey) -> Self {
        Self {
            server_url: None,
            device_id,
            key,
        }
    }

    /// Attach a registration endpoint.
    pub fn with_server_url(mut self, url: &str) -> Self {
        self.server_url = Some(url.to_string());
        self
    }

    /// Parse a scanned or typed pairing payload.
    pub fn parse(payload: &str) -> Result<Self, PairingError> {
        let fields: Vec<&str> = payload.trim().split(SEPARATOR).map(str::trim).collect();

        let (server_url, device, key) = match fields.as_slice() {
            [device, key] => (None, *device, *key),
            [url, device, key] => {
                if url.is_empty() {
                    return Err(PairingError::EmptyField("serverUrl"));
                }
                (Some(url.to_string()), *device, *key)
            }
            other => return Err(PairingError::FieldCount(other.len())),
        };

        if device.is_empty() {
            return Err(PairingError::EmptyField("deviceId"));
        }
        if key.is_empty() {
            return Err(PairingError::EmptyField("presharedKeyHex"));
        }

        Ok(Self {
            server_url,
            device_id: DeviceId::new(device)?,
            key: PresharedKey::from_hex(key)?,
        })
    }

    /// Render as a QR payload in the same format [`PairingInput::parse`] reads.
    pub fn to_qr_payload(&self) -> String {
        match &self.server_url {
            Some(url) => format!("{url}|{}|{}", self.device_id, self.key.to_hex()),
            None => format!("{}|{}", self.device_id, self.key.to_hex()),
        }
    }
}
