// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization-envelope signing
//!
//! Delegated signing calls to the custody provider must carry a
//! `privy-authorization-signature` header: an ECDSA P-256 signature over
//! the canonical JSON (RFC 8785) of
//!
//! ```json
//! {
//!   "body": <request body>,
//!   "headers": { "privy-app-id": <app id> },
//!   "method": "POST",
//!   "url": <full absolute URL>,
//!   "version": 1
//! }
//! ```
//!
//! The payload is canonicalized, SHA-256-hashed, signed (ASN.1 DER), and
//! base64-encoded with the standard alphabet. The delegated-actions key
//! arrives as a base64 PKCS#8 blob, optionally prefixed `wallet-auth:`;
//! the decoded bytes only ever live in scoped zeroizing buffers.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::DecodePrivateKey;
use serde_json::json;
use zeroize::Zeroizing;

use super::secure::secret_from_slice;
use super::SigningError;

const KEY_PREFIX: &str = "wallet-auth:";

/// Parse the delegated-actions key from its transport form.
fn parse_authorization_key(raw_key: &str) -> Result<SigningKey, SigningError> {
    let b64 = raw_key.strip_prefix(KEY_PREFIX).unwrap_or(raw_key).trim();
    let der = Zeroizing::new(BASE64.decode(b64).map_err(SigningError::KeyDecode)?);
    SigningKey::from_pkcs8_der(&der).map_err(|_| SigningError::NotP256)
}

/// Build the canonical envelope payload for a request.
pub(crate) fn envelope_payload(
    body: &serde_json::Value,
    method: &str,
    url: &str,
    app_id: &str,
) -> Result<Zeroizing<Vec<u8>>, SigningError> {
    let payload = json!({
        "body": body,
        "headers": { "privy-app-id": app_id },
        "method": method,
        "url": url,
        "version": 1,
    });
    serde_jcs::to_vec(&payload)
        .map(Zeroizing::new)
        .map_err(SigningError::Canonicalize)
}

/// Compute the `privy-authorization-signature` value for a request.
pub fn authorization_signature(
    body: &serde_json::Value,
    method: &str,
    url: &str,
    app_id: &str,
    raw_key: &str,
) -> Result<String, SigningError> {
    let canonical = envelope_payload(body, method, url, app_id)?;
    sign_payload(raw_key, &canonical)
}

/// Sign an arbitrary payload with the delegated-actions key:
/// SHA-256 over the bytes, ECDSA P-256, ASN.1 DER, base64.
pub fn sign_payload(raw_key: &str, payload: &[u8]) -> Result<String, SigningError> {
    let key = parse_authorization_key(raw_key)?;
    let scoped = secret_from_slice(payload);
    let signature: Signature = key.sign(&scoped);
    Ok(BASE64.encode(signature.to_der().as_bytes()))
}

/// Verify a base64 DER signature over a payload. The inverse of
/// [`sign_payload`]; used by the test suite and by callers that need to
/// double-check their own envelopes.
pub fn verify_signature(
    public_key: &VerifyingKey,
    payload: &[u8],
    signature_b64: &str,
) -> Result<bool, SigningError> {
    let der = BASE64
        .decode(signature_b64)
        .map_err(|err| SigningError::SignatureDecode(err.to_string()))?;
    let signature =
        Signature::from_der(&der).map_err(|err| SigningError::SignatureDecode(err.to_string()))?;
    Ok(public_key.verify(payload, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::EncodePrivateKey;
    use p256::SecretKey;
    use rand::rngs::OsRng;

    fn test_key() -> (String, VerifyingKey) {
        let secret = SecretKey::random(&mut OsRng);
        let der = secret.to_pkcs8_der().unwrap();
        let raw = format!("{KEY_PREFIX}{}", BASE64.encode(der.as_bytes()));
        let verifying = *SigningKey::from(&secret).verifying_key();
        (raw, verifying)
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let (raw_key, public) = test_key();

        for payload in [
            b"plain message".as_slice(),
            &[0u8, 159, 146, 150], // invalid UTF-8
            "unicode \u{1F510} \u{4E2D}\u{6587}".as_bytes(),
            b"",
        ] {
            let signature = sign_payload(&raw_key, payload).unwrap();
            assert!(verify_signature(&public, payload, &signature).unwrap());
        }
    }

    #[test]
    fn verify_fails_on_altered_payload() {
        let (raw_key, public) = test_key();
        let signature = sign_payload(&raw_key, b"original payload").unwrap();
        assert!(!verify_signature(&public, b"original payloae", &signature).unwrap());
    }

    #[test]
    fn key_parses_with_and_without_prefix() {
        let (raw_key, _) = test_key();
        assert!(parse_authorization_key(&raw_key).is_ok());

        let bare = raw_key.strip_prefix(KEY_PREFIX).unwrap();
        assert!(parse_authorization_key(bare).is_ok());
    }

    #[test]
    fn rejects_garbage_keys() {
        assert!(matches!(
            parse_authorization_key("wallet-auth:!!!not-base64!!!"),
            Err(SigningError::KeyDecode(_))
        ));
        // Valid base64, but not a PKCS#8 P-256 key.
        let bogus = BASE64.encode(b"not a key at all");
        assert!(matches!(
            parse_authorization_key(&bogus),
            Err(SigningError::NotP256)
        ));
    }

    #[test]
    fn canonicalization_is_key_order_invariant() {
        let a: serde_json::Value =
            serde_json::from_str(r#"{"zeta": 1, "alpha": {"b": 2, "a": 3}}"#).unwrap();
        let b: serde_json::Value =
            serde_json::from_str(r#"{"alpha": {"a": 3, "b": 2}, "zeta": 1}"#).unwrap();

        let ca = envelope_payload(&a, "POST", "https://api.privy.io/x", "app").unwrap();
        let cb = envelope_payload(&b, "POST", "https://api.privy.io/x", "app").unwrap();
        assert_eq!(ca.as_slice(), cb.as_slice());

        // Identical canonical bytes means identical signatures.
        let (raw_key, _) = test_key();
        assert_eq!(
            sign_payload(&raw_key, &ca).unwrap(),
            sign_payload(&raw_key, &cb).unwrap()
        );
    }

    #[test]
    fn envelope_payload_has_the_pinned_shape() {
        let body = serde_json::json!({"method": "secp256k1_sign"});
        let canonical =
            envelope_payload(&body, "POST", "https://api.privy.io/v1/wallets/w1/rpc", "app-1")
                .unwrap();
        let rendered = String::from_utf8(canonical.to_vec()).unwrap();
        assert_eq!(
            rendered,
            r#"{"body":{"method":"secp256k1_sign"},"headers":{"privy-app-id":"app-1"},"method":"POST","url":"https://api.privy.io/v1/wallets/w1/rpc","version":1}"#
        );
    }
}
