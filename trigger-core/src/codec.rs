//! Authenticator codec for BlueZcript beacons.
//!
//! Turns `(opcode, counter, key)` into the 13-byte [`Payload`]:
//! the 5-byte header (opcode + low 32 bits of the counter, big-endian)
//! followed by the first 8 bytes of `HMAC-SHA256(key, header)`.
//!
//! # Security Notes
//!
//! - The tag is truncated to 64 bits to fit the advertising payload; a
//!   successful forgery buys a single physical trigger, nothing more
//! - Freshness comes from the counter alone; never encode two different
//!   payloads with the same `(key, counter)` pair
//! - Tag comparison on the receiving side is constant time

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use trigger_types::{Payload, TAG_LEN};

type HmacSha256 = Hmac<Sha256>;

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The key has no bytes.
    #[error("authenticator key is empty")]
    EmptyKey,

    /// The HMAC implementation refused the key.
    #[error("invalid authenticator key: {0}")]
    InvalidKey(String),

    /// The tag does not match the payload under this key.
    #[error("authenticator mismatch")]
    InvalidTag,
}

fn keyed_mac(key: &[u8]) -> Result<HmacSha256, CodecError> {
    if key.is_empty() {
        return Err(CodecError::EmptyKey);
    }
    HmacSha256::new_from_slice(key).map_err(|e| CodecError::InvalidKey(e.to_string()))
}

/// Compute the truncated authenticator over `message`.
pub fn authenticator(key: &[u8], message: &[u8]) -> Result<[u8; TAG_LEN], CodecError> {
    let mut mac = keyed_mac(key)?;
    mac.update(message);
    let full = mac.finalize().into_bytes();

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&full[..TAG_LEN]);
    Ok(tag)
}

/// Build a signed payload.
///
/// Pure and deterministic. Fails only if `key` is empty, in which case
/// nothing must be transmitted.
pub fn encode(opcode: u8, counter: u64, key: &[u8]) -> Result<Payload, CodecError> {
    let header = Payload::header(opcode, counter);
    let tag = authenticator(key, &header)?;
    Ok(Payload::new(opcode, counter as u32, tag))
}

/// Check a payload's tag under `key` and return its wire counter.
///
/// Says nothing about freshness; see [`crate::ReplayGuard`].
pub fn authenticate(payload: &Payload, key: &[u8]) -> Result<u32, CodecError> {
    let mut mac = keyed_mac(key)?;
    mac.update(payload.signed_header());
    mac.verify_truncated_left(payload.tag())
        .map_err(|_| CodecError::InvalidTag)?;
    Ok(payload.wire_counter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use trigger_types::Opcode;

    const TRIGGER: u8 = 0x01;

    fn key() -> Vec<u8> {
        vec![0x0f; 16]
    }

    #[test]
    fn known_answer_counter_one() {
        let payload = encode(TRIGGER, 1, &key()).unwrap();

        assert_eq!(payload.as_bytes()[0], 0x01);
        assert_eq!(&payload.as_bytes()[1..5], &[0x00, 0x00, 0x00, 0x01]);
        assert_eq!(hex::encode(payload.tag()), "ea39e0e32e9470e2");
    }

    #[test]
    fn known_answer_counter_two() {
        let payload = encode(TRIGGER, 2, &key()).unwrap();
        assert_eq!(hex::encode(payload.tag()), "9e434d7a04bb7b87");
    }

    #[test]
    fn known_answer_other_key() {
        let key = hex::decode("00112233445566778899aabbccddeeff").unwrap();
        let payload = encode(Opcode::Trigger.as_u8(), 7, &key).unwrap();
        assert_eq!(payload.to_hex(), "0100000007fd45b157c11efff3");
    }

    #[test]
    fn encode_is_deterministic() {
        let a = encode(TRIGGER, 42, &key()).unwrap();
        let b = encode(TRIGGER, 42, &key()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_key_is_rejected() {
        assert_eq!(encode(TRIGGER, 1, &[]), Err(CodecError::EmptyKey));
    }

    #[test]
    fn wire_counter_is_low_32_bits() {
        let low = encode(TRIGGER, 5, &key()).unwrap();
        let high = encode(TRIGGER, (1u64 << 32) + 5, &key()).unwrap();
        assert_eq!(high.wire_counter(), 5);
        assert_eq!(low, high);
    }

    #[test]
    fn flipping_any_key_bit_changes_tag() {
        let base = encode(TRIGGER, 9, &key()).unwrap();
        for byte in 0..16 {
            for bit in 0..8 {
                let mut k = key();
                k[byte] ^= 1 << bit;
                let other = encode(TRIGGER, 9, &k).unwrap();
                assert_ne!(base.tag(), other.tag(), "key byte {byte} bit {bit}");
            }
        }
    }

    #[test]
    fn flipping_any_wire_counter_bit_changes_tag() {
        let counter = 0x5A5A_5A5Au64;
        let base = encode(TRIGGER, counter, &key()).unwrap();
        for bit in 0..32 {
            let other = encode(TRIGGER, counter ^ (1 << bit), &key()).unwrap();
            assert_ne!(base.tag(), other.tag(), "counter bit {bit}");
        }
    }

    #[test]
    fn flipping_any_opcode_bit_changes_tag() {
        let base = encode(TRIGGER, 3, &key()).unwrap();
        for bit in 0..8 {
            let other = encode(TRIGGER ^ (1 << bit), 3, &key()).unwrap();
            assert_ne!(base.tag(), other.tag(), "opcode bit {bit}");
        }
    }

    #[test]
    fn sequential_counters_do_not_collide() {
        let tags: HashSet<Vec<u8>> = (1..=1000u64)
            .map(|n| encode(TRIGGER, n, &key()).unwrap().tag().to_vec())
            .collect();
        assert_eq!(tags.len(), 1000);
    }

    #[test]
    fn authenticate_accepts_genuine_payload() {
        let payload = encode(TRIGGER, 77, &key()).unwrap();
        assert_eq!(authenticate(&payload, &key()), Ok(77));
    }

    #[test]
    fn authenticate_rejects_tampered_counter() {
        let payload = encode(TRIGGER, 77, &key()).unwrap();
        let forged = Payload::new(TRIGGER, 78, payload.tag().try_into().unwrap());
        assert_eq!(authenticate(&forged, &key()), Err(CodecError::InvalidTag));
    }

    #[test]
    fn authenticate_rejects_wrong_key() {
        let payload = encode(TRIGGER, 77, &key()).unwrap();
        let result = authenticate(&payload, &[0x10; 16]);
        assert_eq!(result, Err(CodecError::InvalidTag));
    }
}
