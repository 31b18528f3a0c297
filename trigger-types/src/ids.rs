//! Identity types for BlueZcript.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IdError;

/// Field separator of the pairing payload; never valid inside an id.
const SEPARATOR: char = '|';

/// Number of random bytes in a generated id (12 hex characters).
const GENERATED_ID_BYTES: usize = 6;

/// Identifier of a remote device that can be triggered.
///
/// Opaque to the protocol: either an operator-chosen label or the
/// remote's radio address in normalized form (see [`DeviceId::from_mac`]).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a DeviceId, trimming surrounding whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }
        if trimmed.contains(SEPARATOR) {
            return Err(IdError::ContainsSeparator(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Normalize a radio address (`AA:BB:CC:DD:EE:FF`) to the
    /// lowercase, separator-free form receivers key their tables by.
    pub fn from_mac(address: &str) -> Result<Self, IdError> {
        let normalized: String = address
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if normalized.len() != 12 || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::InvalidAddress(address.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Create a random 12-character hex DeviceId.
    pub fn generate() -> Self {
        let mut bytes = [0u8; GENERATED_ID_BYTES];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(hex::encode(bytes))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}
