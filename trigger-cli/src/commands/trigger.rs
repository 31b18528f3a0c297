//! Fire one trigger.

use anyhow::{Context as _, Result};
use trigger_types::DeviceId;

use super::Context;

/// Run the trigger command.
///
/// The frame goes to stdout via the transport; everything else is logged.
pub async fn run(ctx: &Context, device: &str) -> Result<()> {
    let device_id = DeviceId::new(device).context("Invalid device id")?;
    let dispatcher = ctx.dispatcher().await?;

    let payload = dispatcher
        .trigger(&device_id)
        .await
        .with_context(|| format!("Failed to trigger {device_id}"))?;

    tracing::debug!(device = %device_id, payload = %payload, "frame written");
    Ok(())
}
