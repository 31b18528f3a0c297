//! Mock transport for testing.
//!
//! Captures broadcast payloads for verification and can be told to reject
//! the next one.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use trigger_types::Payload;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep a handle after moving one into
/// the dispatcher.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    broadcasts: Vec<Payload>,
    reject_next: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all payloads that were accepted.
    pub fn broadcasts(&self) -> Vec<Payload> {
        let inner = self.inner.lock().unwrap();
        inner.broadcasts.clone()
    }

    /// Get the last payload that was accepted.
    pub fn last_broadcast(&self) -> Option<Payload> {
        let inner = self.inner.lock().unwrap();
        inner.broadcasts.last().copied()
    }

    /// Cause the next broadcast() to be rejected with the given reason.
    pub fn reject_next(&self, reason: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.reject_next = Some(reason.to_string());
    }

    /// Clear all captured payloads and pending failures.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn broadcast(&self, payload: &Payload) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        // Check for forced failure
        if let Some(reason) = inner.reject_next.take() {
            return Err(TransportError::Rejected(reason));
        }

        inner.broadcasts.push(*payload);
        Ok(())
    }
}
