//! # trigger-client
//!
//! Sender side of the BlueZcript authenticated trigger protocol.
//!
//! This is the library a mobile or desktop client embeds to fire triggers.
//!
//! ## Features
//!
//! - **Credential Store**: durable per-device pairing records with a
//!   monotonic send counter, serialized per device
//! - **Transport Abstraction**: pluggable broadcast layer (radio, mock)
//! - **Dispatcher**: advance counter, sign, hand off; no hidden retries
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use trigger_client::{FileStore, MockTransport, TriggerDispatcher};
//!
//! let store = Arc::new(FileStore::open("/var/lib/bluezcript/pairings").await?);
//! let dispatcher = TriggerDispatcher::new(store, MockTransport::new());
//!
//! dispatcher.pair(&device_id, "0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f").await?;
//! let payload = dispatcher.trigger(&device_id).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatcher;
pub mod error;
pub mod store;
pub mod transport;

pub use dispatcher::{DispatchEvent, Outcome, TriggerDispatcher};
pub use error::TriggerError;
pub use store::{CredentialStore, FileStore, MemoryStore, PairingRecord, StoreError};
pub use transport::{MockTransport, Transport, TransportError};
