//! Save a pairing credential.

use anyhow::{bail, Context as _, Result};
use trigger_core::PairingInput;
use trigger_types::{DeviceId, PresharedKey};

use super::Context;

/// Parse the pairing either from a QR payload or from `--device`/`--key`.
pub fn parse_input(
    payload: Option<&str>,
    device: Option<&str>,
    key: Option<&str>,
) -> Result<PairingInput> {
    match (payload, device, key) {
        (Some(payload), None, None) => {
            PairingInput::parse(payload).context("Invalid pairing payload")
        }
        (None, Some(device), Some(key)) => {
            let device_id = DeviceId::new(device).context("Invalid device id")?;
            let key = PresharedKey::from_hex(key).context("Invalid key format")?;
            Ok(PairingInput::new(device_id, key))
        }
        _ => bail!("Specify either a pairing payload or both --device and --key"),
    }
}

/// Run the pair command.
pub async fn run(
    ctx: &Context,
    payload: Option<&str>,
    device: Option<&str>,
    key: Option<&str>,
) -> Result<()> {
    let input = parse_input(payload, device, key)?;
    let dispatcher = ctx.dispatcher().await?;

    if let Some(url) = &input.server_url {
        // Registration with the pairing server is a separate HTTP exchange
        println!("Note: register this client with {url} out of band.");
    }

    dispatcher
        .pair_input(&input)
        .await
        .with_context(|| format!("Failed to pair with {}", input.device_id))?;

    println!("Paired with {} (counter reset to 0).", input.device_id);
    Ok(())
}
