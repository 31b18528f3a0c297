//! Line-oriented frame output.
//!
//! The CLI does not drive a radio itself. Each accepted trigger is written
//! as one hex line so a helper (`btmgmt`, a BlueZ script, a phone bridge)
//! can advertise it.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use trigger_client::{Transport, TransportError};
use trigger_types::Payload;

use crate::config::{FrameFormat, TransportConfig};

/// Writes each broadcast as a hex line.
pub struct FrameTransport<W> {
    config: TransportConfig,
    out: Mutex<W>,
}

impl FrameTransport<std::io::Stdout> {
    /// Frame transport on stdout.
    pub fn stdout(config: TransportConfig) -> Self {
        Self::new(config, std::io::stdout())
    }
}

impl<W: Write + Send> FrameTransport<W> {
    /// Frame transport on any writer.
    pub fn new(config: TransportConfig, out: W) -> Self {
        Self {
            config,
            out: Mutex::new(out),
        }
    }

    /// Render a payload the way it will be written.
    pub fn render(&self, payload: &Payload) -> String {
        match self.config.format {
            FrameFormat::Manufacturer => {
                hex::encode(payload.to_manufacturer_data(self.config.company_id))
            }
            FrameFormat::Payload => payload.to_hex(),
        }
    }

    /// Consume the transport and return the writer.
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<W: Write + Send> Transport for FrameTransport<W> {
    async fn broadcast(&self, payload: &Payload) -> Result<(), TransportError> {
        let line = self.render(payload);
        let mut out = self
            .out
            .lock()
            .map_err(|_| TransportError::Unavailable("output lock poisoned".into()))?;
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| TransportError::Rejected(e.to_string()))
    }
}
