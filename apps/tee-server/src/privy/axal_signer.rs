// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator-local signing with the claiming wallet key.
//!
//! Recreates the provider's `secp256k1_sign` method with the operator's
//! own secp256k1 key: the 32-byte hash is signed directly, producing a
//! 65-byte recoverable `r || s || v` signature, hex-encoded.

use k256::ecdsa::SigningKey;
use tracing::error;
use zeroize::Zeroizing;

use super::client::PrivyClient;
use super::data::{Secp256k1SignResponse, SignatureData};
use crate::error::ApiError;

impl PrivyClient {
    /// Sign a raw hash with the operator's claiming wallet key. Requires
    /// the operator config to carry one.
    pub(crate) fn sign_hash_with_claiming_wallet(
        &self,
        hash_hex: &str,
    ) -> Result<Secp256k1SignResponse, ApiError> {
        let Some(axal) = self.tee().axal.as_ref() else {
            error!("operator config is not loaded");
            return Err(ApiError::internal());
        };
        let Some(key_hex) = axal.axal_claiming_wallet_pk.as_deref() else {
            error!("operator claiming wallet key is not configured");
            return Err(ApiError::internal());
        };
        sign_hash_with_claiming_key(hash_hex, key_hex)
    }
}

/// Sign `hash_hex` (0x-prefix tolerated, must decode to 32 bytes) with a
/// hex-encoded secp256k1 private key.
pub fn sign_hash_with_claiming_key(
    hash_hex: &str,
    key_hex: &str,
) -> Result<Secp256k1SignResponse, ApiError> {
    let hash_body = hash_hex.strip_prefix("0x").unwrap_or(hash_hex);
    let hash = hex::decode(hash_body).map_err(|err| {
        error!(error = %err, "failed to decode hash");
        ApiError::internal()
    })?;
    if hash.len() != 32 {
        error!(len = hash.len(), "claiming-key signing requires a 32-byte hash");
        return Err(ApiError::internal());
    }

    let key_bytes = Zeroizing::new(hex::decode(key_hex.trim()).map_err(|err| {
        error!(error = %err, "failed to decode private key");
        ApiError::internal()
    })?);
    let key = SigningKey::from_slice(&key_bytes).map_err(|err| {
        error!(error = %err, "failed to parse private key");
        ApiError::internal()
    })?;

    let (signature, recovery_id) = key.sign_prehash_recoverable(&hash).map_err(|err| {
        error!(error = %err, "failed to sign hash");
        ApiError::internal()
    })?;

    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte();

    Ok(Secp256k1SignResponse {
        method: "axal_sign".into(),
        data: SignatureData {
            signature: format!("0x{}", hex::encode(out)),
            encoding: "hex".into(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
    use rand::rngs::OsRng;
    use sha2::{Digest, Sha256};

    fn test_key() -> (String, VerifyingKey) {
        let key = SigningKey::random(&mut OsRng);
        (hex::encode(key.to_bytes()), *key.verifying_key())
    }

    #[test]
    fn signature_recovers_the_signing_key() {
        let (key_hex, verifying) = test_key();
        let hash = Sha256::digest(b"claiming-key test message");
        let hash_hex = format!("0x{}", hex::encode(hash));

        let response = sign_hash_with_claiming_key(&hash_hex, &key_hex).unwrap();
        assert_eq!(response.method, "axal_sign");
        assert_eq!(response.data.encoding, "hex");

        let raw = hex::decode(response.data.signature.strip_prefix("0x").unwrap()).unwrap();
        assert_eq!(raw.len(), 65);

        let signature = Signature::from_slice(&raw[..64]).unwrap();
        let recovery_id = RecoveryId::from_byte(raw[64]).unwrap();
        let recovered =
            VerifyingKey::recover_from_prehash(&hash, &signature, recovery_id).unwrap();
        assert_eq!(recovered, verifying);
    }

    #[test]
    fn hash_prefix_is_optional() {
        let (key_hex, _) = test_key();
        let hash = hex::encode(Sha256::digest(b"no prefix"));
        assert!(sign_hash_with_claiming_key(&hash, &key_hex).is_ok());
    }

    #[test]
    fn rejects_short_hashes_and_bad_keys() {
        let (key_hex, _) = test_key();
        assert!(sign_hash_with_claiming_key("0x1234", &key_hex).is_err());
        assert!(sign_hash_with_claiming_key("0xzz", &key_hex).is_err());

        let hash = format!("0x{}", hex::encode(Sha256::digest(b"msg")));
        assert!(sign_hash_with_claiming_key(&hash, "not-hex").is_err());
        assert!(sign_hash_with_claiming_key(&hash, "abcd").is_err());
    }
}
