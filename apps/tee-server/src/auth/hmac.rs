// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Orchestrator HMAC verification
//!
//! The orchestrator signs requests with HMAC-SHA256 over a shared secret,
//! sent as lowercase hex. The signed message is pinned:
//!
//! - single signing request: the raw `params.hash` string exactly as it
//!   appears in the request body;
//! - batch request: every item's hash joined with `":"` in submitted
//!   order, verified once for the whole batch.
//!
//! Comparison is constant-time over the hex encodings.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::signing::secure::constant_time_eq;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over `message`, hex-encoded.
fn sign_message(message: &str, secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify an orchestrator signature: recompute the HMAC and compare in
/// constant time against the supplied hex signature.
pub fn verify_axal_signature(message: &str, signature_hex: &str, secret: &str) -> bool {
    let expected = sign_message(message, secret.as_bytes());
    constant_time_eq(expected.as_bytes(), signature_hex.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        // Vectors cross-checked against an independent HMAC-SHA256 oracle.
        assert_eq!(
            sign_message("hello world", b"secret"),
            "734cc62f32841568f45715aeb9f4d7891324e6d948e4c6c60c0621cdac48623a"
        );
        assert_eq!(
            sign_message("", b"secret"),
            "f9e66e179b6747ae54108f82f8ade8b3c25d76fd30afde6c395822c530196169"
        );
        assert_eq!(
            sign_message("hello world", b""),
            "c2ea634c993f050482b4e6243224087f7c23bdd3c07ab1a45e9a21c62fad994e"
        );
        assert_eq!(
            sign_message("hello@world#2024!", b"my-secret-key"),
            "7055b3b9a0eff6f744a5a4e86781e1cd3804ab5a1e57d650a73c71e2bf57ab72"
        );
    }

    #[test]
    fn verify_accepts_matching_signature() {
        let hash = "0x59f6f0ad2299c02ceb64a7e1efb2d984dd0a3d9f7c914b2a766d313dfabad313";
        let signature = sign_message(hash, b"orchestrator-secret");
        assert!(verify_axal_signature(hash, &signature, "orchestrator-secret"));
    }

    #[test]
    fn verify_rejects_single_bit_flip() {
        let hash = "0x59f6f0ad2299c02ceb64a7e1efb2d984dd0a3d9f7c914b2a766d313dfabad313";
        let mut signature = sign_message(hash, b"orchestrator-secret").into_bytes();
        // Flip one bit of the first hex character.
        signature[0] ^= 0x01;
        let tampered = String::from_utf8(signature).unwrap();
        assert!(!verify_axal_signature(hash, &tampered, "orchestrator-secret"));
    }

    #[test]
    fn verify_rejects_wrong_secret_and_wrong_message() {
        let signature = sign_message("0xabc", b"secret-a");
        assert!(!verify_axal_signature("0xabc", &signature, "secret-b"));
        assert!(!verify_axal_signature("0xabd", &signature, "secret-a"));
    }

    #[test]
    fn verify_rejects_truncated_signature() {
        let signature = sign_message("0xabc", b"secret");
        assert!(!verify_axal_signature("0xabc", &signature[..32], "secret"));
        assert!(!verify_axal_signature("0xabc", "", "secret"));
    }
}
