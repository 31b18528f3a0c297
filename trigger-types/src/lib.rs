//! # trigger-types
//!
//! Wire format types for the BlueZcript authenticated trigger protocol.
//!
//! This crate provides the foundational types used across all BlueZcript crates:
//! - [`DeviceId`] - Identifier of a remote device the client can trigger
//! - [`PresharedKey`] - Symmetric pairing secret (zeroized on drop)
//! - [`Payload`], [`Opcode`] - The 13-byte broadcast message
//! - [`KeyError`], [`WireError`], [`IdError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod key;
mod payload;

pub use error::{IdError, KeyError, WireError};
pub use ids::DeviceId;
pub use key::{PresharedKey, DEFAULT_KEY_LEN};
pub use payload::{
    Opcode, Payload, COMPANY_ID, HEADER_LEN, MANUFACTURER_DATA_LEN, PAYLOAD_LEN, TAG_LEN,
};
