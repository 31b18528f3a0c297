//! Error types for BlueZcript wire types.

use thiserror::Error;

/// Errors produced when decoding a pre-shared key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The key has no bytes.
    #[error("pre-shared key is empty")]
    Empty,

    /// Hex input has an odd number of characters.
    #[error("pre-shared key hex has odd length: {len}")]
    OddLength {
        /// Number of hex characters supplied.
        len: usize,
    },

    /// Hex input contains a non-hex character.
    #[error("pre-shared key is not valid hex: {0}")]
    InvalidHex(String),
}

/// Errors produced when parsing a device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier is empty after trimming.
    #[error("device id is empty")]
    Empty,

    /// The identifier contains the pairing field separator.
    #[error("device id must not contain '|': {0}")]
    ContainsSeparator(String),

    /// A radio address could not be normalized.
    #[error("invalid radio address: {0}")]
    InvalidAddress(String),
}

/// Errors produced when parsing broadcast frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The frame is shorter than required.
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The payload has the wrong length.
    #[error("invalid payload length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Unknown opcode byte.
    #[error("unknown opcode: 0x{0:02x}")]
    UnknownOpcode(u8),

    /// Manufacturer data carries a different company id.
    #[error("unexpected company id: 0x{actual:04x} (expected 0x{expected:04x})")]
    CompanyId {
        /// Company id we listen for.
        expected: u16,
        /// Company id found in the frame.
        actual: u16,
    },

    /// Hex dump could not be decoded.
    #[error("invalid hex frame: {0}")]
    InvalidHex(String),
}
