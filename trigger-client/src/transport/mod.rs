//! Transport abstraction for BlueZcript.
//!
//! The dispatcher hands a finished 13-byte payload to a [`Transport`]; the
//! transport decides how it reaches the air (BLE advertising, a helper
//! process, a mock for testing). It is a fire-and-forget broadcast: an
//! `Ok` means the radio layer accepted the frame, not that anyone heard it.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.broadcast(&payload).await?;
//! assert_eq!(transport.last_broadcast(), Some(payload));
//! ```

mod mock;

pub use mock::MockTransport;

use async_trait::async_trait;
use thiserror::Error;
use trigger_types::Payload;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The radio layer refused the frame.
    #[error("broadcast rejected: {0}")]
    Rejected(String),

    /// No radio available (adapter off, permission missing).
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Transport trait for broadcasting signed trigger payloads.
///
/// Implementations must not retry on their own; the caller decides
/// whether a fresh trigger (with a fresh counter) is worth sending.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Broadcast one payload.
    async fn broadcast(&self, payload: &Payload) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn broadcast(&self, payload: &Payload) -> Result<(), TransportError> {
        (**self).broadcast(payload).await
    }
}
