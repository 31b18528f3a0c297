//! CLI command implementations.

pub mod keygen;
pub mod pair;
pub mod reset;
pub mod status;
pub mod trigger;
pub mod verify;

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::sync::Arc;
use trigger_client::{FileStore, TriggerDispatcher};

use crate::config::TransportConfig;
use crate::transport::FrameTransport;

/// What every store-backed command needs.
#[derive(Debug, Clone)]
pub struct Context {
    /// Credential directory.
    pub store_dir: PathBuf,
    /// Frame output settings.
    pub transport: TransportConfig,
}

/// Dispatcher writing frames to stdout.
pub type Dispatcher = TriggerDispatcher<FileStore, FrameTransport<std::io::Stdout>>;

impl Context {
    /// Open the credential store and wire up a dispatcher.
    pub async fn dispatcher(&self) -> Result<Dispatcher> {
        let store = FileStore::open(&self.store_dir).await.with_context(|| {
            format!(
                "Failed to open credential store at {}",
                self.store_dir.display()
            )
        })?;
        Ok(TriggerDispatcher::new(
            Arc::new(store),
            FrameTransport::stdout(self.transport.clone()),
        ))
    }
}
