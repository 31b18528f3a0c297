//! # trigger-core
//!
//! Pure logic for BlueZcript (no I/O, instant tests).
//!
//! This crate implements the authenticator codec, the pairing payload
//! format and the per-device pairing state machine without any disk or
//! radio I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Known-answer tests against the wire format
//!
//! Persistence of counters and handing payloads to the radio are done by
//! `trigger-client`. The receiver-side helpers ([`ReplayGuard`],
//! [`BeaconVerifier`]) state the contract a listener has to satisfy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod pairing;
pub mod replay;
pub mod state;
pub mod verify;

pub use codec::{authenticate, authenticator, encode, CodecError};
pub use pairing::{PairingError, PairingInput};
pub use replay::{ReplayError, ReplayGuard, DEFAULT_WINDOW};
pub use state::{PairingEvent, PairingState, StateError};
pub use verify::{BeaconVerifier, VerifyError};
