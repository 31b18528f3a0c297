//! Forget one or all pairings.

use anyhow::{bail, Context as _, Result};
use trigger_types::DeviceId;

use super::Context;

/// Run the reset command.
pub async fn run(ctx: &Context, device: Option<&str>, all: bool) -> Result<()> {
    let dispatcher = ctx.dispatcher().await?;

    match (device, all) {
        (None, true) => {
            let removed = dispatcher.reset_all().await?;
            println!("Removed {removed} pairing(s).");
        }
        (Some(device), false) => {
            let device_id = DeviceId::new(device).context("Invalid device id")?;
            if dispatcher.reset(&device_id).await? {
                println!("Removed pairing for {device_id}.");
            } else {
                println!("{device_id} was not paired.");
            }
        }
        _ => bail!("Specify either a device or --all"),
    }

    Ok(())
}
