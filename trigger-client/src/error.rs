//! Dispatcher errors.

use thiserror::Error;
use trigger_types::{DeviceId, KeyError};

use crate::store::StoreError;
use crate::transport::TransportError;

/// Errors returned by [`TriggerDispatcher`](crate::TriggerDispatcher).
///
/// None of these are retried inside the dispatcher. After any trigger
/// failure the device stays paired.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// No pairing exists for the device.
    #[error("device {device_id} is not paired")]
    NotPaired {
        /// The device that was addressed.
        device_id: DeviceId,
    },

    /// Persistence failed; the counter may or may not have advanced.
    #[error("credential store error: {0}")]
    Store(#[source] StoreError),

    /// The supplied key is not even-length hex. No record was written.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(#[from] KeyError),

    /// A stored key could not be used to sign. Indicates a defect or a
    /// record written by something else.
    #[error("encoding failed: {reason}")]
    Encoding {
        /// What went wrong.
        reason: String,
    },

    /// The transport refused the payload. The counter was already spent.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl TriggerError {
    /// Whether a fresh attempt could succeed without user action.
    ///
    /// A retry always issues a new counter; the failed one is never reused.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(StoreError::Io { .. } | StoreError::Unavailable(_)) => true,
            Self::Transport(_) => true,
            _ => false,
        }
    }
}

impl From<StoreError> for TriggerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { device_id } => Self::NotPaired { device_id },
            e @ StoreError::InvalidKey { .. } => Self::Encoding {
                reason: e.to_string(),
            },
            other => Self::Store(other),
        }
    }
}
