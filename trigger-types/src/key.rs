//! Pre-shared key material.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::KeyError;

/// Length of a freshly generated key in bytes (32 hex characters).
pub const DEFAULT_KEY_LEN: usize = 16;

/// Symmetric secret established out-of-band during pairing.
///
/// Used as the HMAC key for every beacon sent to one device. Never empty.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PresharedKey(Vec<u8>);

impl PresharedKey {
    /// Create a new random key of [`DEFAULT_KEY_LEN`] bytes.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; DEFAULT_KEY_LEN];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(bytes)
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, KeyError> {
        if bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self(bytes))
    }

    /// Decode from an even-length hex string (case-insensitive).
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let hex_str = hex_str.trim();
        if hex_str.is_empty() {
            return Err(KeyError::Empty);
        }
        if hex_str.len() % 2 != 0 {
            return Err(KeyError::OddLength { len: hex_str.len() });
        }
        let bytes = hex::decode(hex_str).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// Encode as lowercase hex, the persisted form.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the key has no bytes (never true once constructed).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Intentionally opaque debug to avoid logging secrets
impl fmt::Debug for PresharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PresharedKey([REDACTED; {}])", self.0.len())
    }
}
