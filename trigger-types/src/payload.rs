//! The 13-byte authenticated broadcast payload.
//!
//! Layout (big-endian):
//!
//! ```text
//! offset 0       : opcode            (1 byte,  0x01 = trigger)
//! offset 1..4    : counter (low 32b) (4 bytes)
//! offset 5..12   : HMAC-SHA256(key, bytes[0..5))[0..8]
//! ```
//!
//! On air the payload travels as BLE manufacturer-specific data, prefixed
//! with a little-endian company id.

use std::fmt;

use crate::error::WireError;

/// Total payload length.
pub const PAYLOAD_LEN: usize = 13;

/// Length of the signed header (opcode + wire counter).
pub const HEADER_LEN: usize = 5;

/// Length of the truncated authenticator.
pub const TAG_LEN: usize = 8;

/// Company id used for manufacturer-specific data (reserved test id).
pub const COMPANY_ID: u16 = 0xFFFF;

/// Manufacturer data length: company id + payload.
pub const MANUFACTURER_DATA_LEN: usize = 2 + PAYLOAD_LEN;

/// Message type carried in byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Fire the remote trigger.
    Trigger = 0x01,
}

impl Opcode {
    /// The wire byte for this opcode.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op.as_u8()
    }
}

impl TryFrom<u8> for Opcode {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Opcode::Trigger),
            other => Err(WireError::UnknownOpcode(other)),
        }
    }
}

/// A signed broadcast payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Payload([u8; PAYLOAD_LEN]);

impl Payload {
    /// Assemble a payload from its fields.
    pub fn new(opcode: u8, wire_counter: u32, tag: [u8; TAG_LEN]) -> Self {
        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes[0] = opcode;
        bytes[1..HEADER_LEN].copy_from_slice(&wire_counter.to_be_bytes());
        bytes[HEADER_LEN..].copy_from_slice(&tag);
        Self(bytes)
    }

    /// Build the signed header for a given opcode and 64-bit counter.
    ///
    /// The counter is truncated to its low 32 bits.
    pub fn header(opcode: u8, counter: u64) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0] = opcode;
        header[1..].copy_from_slice(&(counter as u32).to_be_bytes());
        header
    }

    /// Parse from exactly [`PAYLOAD_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        let arr: [u8; PAYLOAD_LEN] = bytes.try_into().map_err(|_| WireError::InvalidLength {
            expected: PAYLOAD_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Parse a hex dump of either a bare payload or manufacturer data.
    pub fn from_hex(hex_str: &str, company_id: u16) -> Result<Self, WireError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| WireError::InvalidHex(e.to_string()))?;
        if bytes.len() == PAYLOAD_LEN {
            Self::from_bytes(&bytes)
        } else {
            Self::from_manufacturer_data(&bytes, company_id)
        }
    }

    /// Parse manufacturer-specific data: little-endian company id, then payload.
    ///
    /// Trailing bytes after the payload are ignored.
    pub fn from_manufacturer_data(data: &[u8], company_id: u16) -> Result<Self, WireError> {
        if data.len() < MANUFACTURER_DATA_LEN {
            return Err(WireError::TooShort {
                expected: MANUFACTURER_DATA_LEN,
                actual: data.len(),
            });
        }
        let actual = u16::from_le_bytes([data[0], data[1]]);
        if actual != company_id {
            return Err(WireError::CompanyId {
                expected: company_id,
                actual,
            });
        }
        Self::from_bytes(&data[2..MANUFACTURER_DATA_LEN])
    }

    /// Frame as manufacturer-specific data.
    pub fn to_manufacturer_data(&self, company_id: u16) -> [u8; MANUFACTURER_DATA_LEN] {
        let mut data = [0u8; MANUFACTURER_DATA_LEN];
        data[..2].copy_from_slice(&company_id.to_le_bytes());
        data[2..].copy_from_slice(&self.0);
        data
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    /// The raw opcode byte.
    pub fn opcode_byte(&self) -> u8 {
        self.0[0]
    }

    /// The decoded opcode.
    pub fn opcode(&self) -> Result<Opcode, WireError> {
        Opcode::try_from(self.0[0])
    }

    /// The 32-bit counter as carried on the wire.
    pub fn wire_counter(&self) -> u32 {
        u32::from_be_bytes([self.0[1], self.0[2], self.0[3], self.0[4]])
    }

    /// The signed portion (opcode + wire counter).
    pub fn signed_header(&self) -> &[u8] {
        &self.0[..HEADER_LEN]
    }

    /// The truncated authenticator.
    pub fn tag(&self) -> &[u8] {
        &self.0[HEADER_LEN..]
    }

    /// Lowercase hex of the payload bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("opcode", &format_args!("0x{:02x}", self.opcode_byte()))
            .field("wire_counter", &self.wire_counter())
            .field("tag", &hex::encode(self.tag()))
            .finish()
    }
}
