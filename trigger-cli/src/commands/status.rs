//! Show paired devices.

use anyhow::Result;
use trigger_client::CredentialStore;

use super::Context;

/// Run the status command.
pub async fn run(ctx: &Context) -> Result<()> {
    let dispatcher = ctx.dispatcher().await?;
    let devices = dispatcher.paired_devices().await?;

    println!("=== bluezcript status ===");
    println!();
    println!("Store: {}", ctx.store_dir.display());
    println!(
        "Frames: {:?} (company id 0x{:04x})",
        ctx.transport.format, ctx.transport.company_id
    );
    println!();

    if devices.is_empty() {
        println!("Devices: NONE PAIRED");
        println!();
        println!("Run 'bluezcript pair <payload>' to pair with a device.");
        return Ok(());
    }

    println!("Devices:");
    for device_id in devices {
        match dispatcher.store().get(&device_id).await {
            Ok(record) => println!("  {device_id}  (counter: {})", record.send_counter),
            Err(e) => println!("  {device_id}  (unreadable: {e})"),
        }
    }

    Ok(())
}
