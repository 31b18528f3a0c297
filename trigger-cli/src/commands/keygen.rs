//! Mint a fresh pairing credential.
//!
//! Run on (or for) the receiving device: prints the pairing payload the
//! phone scans. The receiver keeps the same id and key in its own
//! registry.

use anyhow::{Context, Result};
use trigger_core::PairingInput;
use trigger_types::{DeviceId, PresharedKey};

/// Build a pairing payload with a random key.
///
/// `mac` wins over `device_id`; with neither, a random 6-byte id is used.
pub fn generate(
    device_id: Option<&str>,
    mac: Option<&str>,
    server_url: Option<&str>,
) -> Result<PairingInput> {
    let device_id = match (mac, device_id) {
        (Some(mac), _) => DeviceId::from_mac(mac).context("Invalid MAC address")?,
        (None, Some(id)) => DeviceId::new(id).context("Invalid device id")?,
        (None, None) => DeviceId::generate(),
    };

    let input = PairingInput::new(device_id, PresharedKey::generate());
    Ok(match server_url {
        Some(url) => input.with_server_url(url),
        None => input,
    })
}

/// Run the keygen command.
pub fn run(device_id: Option<&str>, mac: Option<&str>, server_url: Option<&str>) -> Result<()> {
    let input = generate(device_id, mac, server_url)?;

    println!("Device ID: {}", input.device_id);
    println!("Key:       {}", input.key.to_hex());
    println!();
    println!("Pairing payload (encode as QR or pass to 'bluezcript pair'):");
    println!("{}", input.to_qr_payload());
    Ok(())
}
