//! Check a captured frame the way a receiver would.

use anyhow::{Context, Result};
use trigger_core::BeaconVerifier;
use trigger_types::{DeviceId, Payload, PresharedKey};

/// Verify `frame` (bare payload or manufacturer data, hex) under `key_hex`,
/// treating `last_seen` as the last counter the receiver accepted.
///
/// Returns the accepted wire counter.
pub fn check(frame: &str, key_hex: &str, last_seen: u32, company_id: u16) -> Result<u32> {
    let payload = Payload::from_hex(frame, company_id).context("Invalid frame")?;
    let key = PresharedKey::from_hex(key_hex).context("Invalid key format")?;

    let sender = DeviceId::new("captured").context("Invalid device id")?;
    let mut verifier = BeaconVerifier::new();
    verifier.register_with_last_seen(sender.clone(), key, last_seen);

    verifier
        .verify(&sender, &payload)
        .context("Frame rejected")
}

/// Run the verify command.
pub fn run(frame: &str, key_hex: &str, last_seen: u32, company_id: u16) -> Result<()> {
    let counter = check(frame, key_hex, last_seen, company_id)?;
    println!("Valid trigger (counter: {counter})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigger_core::{ReplayError, VerifyError};
    use trigger_types::COMPANY_ID;

    const KEY_HEX: &str = "0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f";
    const FRAME: &str = "ffff0100000001ea39e0e32e9470e2";

    #[test]
    fn accepts_manufacturer_frame() {
        assert_eq!(check(FRAME, KEY_HEX, 0, COMPANY_ID).unwrap(), 1);
    }

    #[test]
    fn accepts_bare_payload() {
        let counter = check("0100000001ea39e0e32e9470e2", KEY_HEX, 0, COMPANY_ID).unwrap();
        assert_eq!(counter, 1);
    }

    #[test]
    fn rejects_replay() {
        let err = check(FRAME, KEY_HEX, 1, COMPANY_ID).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VerifyError>(),
            Some(VerifyError::Replay(ReplayError::Stale { .. }))
        ));
    }

    #[test]
    fn rejects_wrong_key() {
        let err = check(FRAME, "00112233445566778899aabbccddeeff", 0, COMPANY_ID).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VerifyError>(),
            Some(VerifyError::Codec(_))
        ));
    }

    #[test]
    fn rejects_wrong_company() {
        assert!(check(FRAME, KEY_HEX, 0, 0x0059).is_err());
    }
}
