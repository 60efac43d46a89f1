// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity-provider JWT verification
//!
//! User routes authenticate with a compact JWT issued by the identity
//! provider. Verification is deliberately narrow:
//!
//! 1. The header `alg` must be exactly `ES256`.
//! 2. The signature must verify against the configured P-256 public key.
//! 3. `aud` must equal the configured app ID and `iss` must be
//!    `privy.io`.
//! 4. `exp` is enforced (strictly, no leeway) in `prod` and `staging`;
//!    `dev` and `local` accept expired tokens so deterministic test
//!    tokens keep working.
//! 5. `sub` must be non-empty and begin with `did:privy:`. The `sub`
//!    value is the principal ID handed to the rest of the service.
//!
//! The verification key arrives through the secret store and may be a
//! standard multi-line PEM, a JSON string with escaped `\n`, or a
//! single line with spaces where the newlines used to be. The last form
//! is re-wrapped to 64-character body lines. Any other shape is a bug
//! in the secret, not a format to support.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::Environment;

/// Required prefix of the principal identifier.
pub const PRIVY_DID_PREFIX: &str = "did:privy:";

const EXPECTED_ISSUER: &str = "privy.io";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum JwtError {
    #[error("token cannot be empty")]
    EmptyToken,
    #[error("verification key is not configured")]
    MissingVerificationKey,
    #[error("app ID is not configured")]
    MissingAppId,
    #[error("unexpected JWT signing method: {0}")]
    UnexpectedAlgorithm(String),
    #[error("failed to parse verification key: {0}")]
    InvalidVerificationKey(String),
    #[error("JWT signature is invalid")]
    InvalidSignature,
    #[error("token is expired")]
    Expired,
    #[error("iss claim must be 'privy.io'")]
    InvalidIssuer,
    #[error("aud claim must be the configured app ID")]
    InvalidAudience,
    #[error("token does not contain user subject")]
    MissingSubject,
    #[error("invalid user DID format: expected 'did:privy:' prefix, got {0}")]
    InvalidSubject(String),
    #[error("token is malformed")]
    Malformed,
}

#[derive(Debug, Deserialize)]
struct PrivyClaims {
    #[serde(default)]
    sub: String,
    #[serde(default)]
    #[allow(dead_code)]
    exp: Option<i64>,
    #[serde(default)]
    #[allow(dead_code)]
    iat: Option<i64>,
}

/// Validate a bearer token and extract the principal ID (`sub`).
pub fn validate_jwt_and_extract_principal(
    token: &str,
    verification_key_pem: &str,
    app_id: &str,
    environment: Environment,
) -> Result<String, JwtError> {
    if token.is_empty() {
        return Err(JwtError::EmptyToken);
    }
    if verification_key_pem.is_empty() {
        return Err(JwtError::MissingVerificationKey);
    }
    if app_id.is_empty() {
        return Err(JwtError::MissingAppId);
    }

    let header = decode_header(token).map_err(|_| JwtError::Malformed)?;
    if header.alg != Algorithm::ES256 {
        return Err(JwtError::UnexpectedAlgorithm(format!("{:?}", header.alg)));
    }

    let pem = normalize_pem(verification_key_pem);
    let key = DecodingKey::from_ec_pem(pem.as_bytes())
        .map_err(|err| JwtError::InvalidVerificationKey(err.to_string()))?;

    let mut validation = Validation::new(Algorithm::ES256);
    validation.leeway = 0;
    validation.set_audience(&[app_id]);
    validation.set_issuer(&[EXPECTED_ISSUER]);
    validation.validate_exp = environment.enforces_token_expiry();
    if validation.validate_exp {
        validation.set_required_spec_claims(&["aud", "iss", "sub", "exp"]);
    } else {
        validation.set_required_spec_claims(&["aud", "iss", "sub"]);
    }

    let data = decode::<PrivyClaims>(token, &key, &validation).map_err(map_decode_error)?;

    let sub = data.claims.sub;
    if sub.is_empty() {
        return Err(JwtError::MissingSubject);
    }
    if !sub.starts_with(PRIVY_DID_PREFIX) {
        return Err(JwtError::InvalidSubject(sub));
    }
    Ok(sub)
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidEcdsaKey => JwtError::InvalidSignature,
        ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        ErrorKind::InvalidAudience => JwtError::InvalidAudience,
        ErrorKind::InvalidAlgorithm => JwtError::UnexpectedAlgorithm("unknown".into()),
        ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
            "sub" => JwtError::MissingSubject,
            "exp" => JwtError::Expired,
            "aud" => JwtError::InvalidAudience,
            "iss" => JwtError::InvalidIssuer,
            _ => JwtError::Malformed,
        },
        _ => JwtError::Malformed,
    }
}

/// Accept the three key shapes the secret store produces and return a
/// standard multi-line PEM.
fn normalize_pem(raw: &str) -> String {
    // JSON strings carry escaped newlines.
    let key = raw.replace("\\n", "\n");
    if key.contains('\n') {
        return key;
    }

    // Single-line form: spaces delimit the markers and the body chunks.
    const BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
    const END: &str = "-----END PUBLIC KEY-----";
    let (Some(start), Some(end)) = (key.find(BEGIN), key.rfind(END)) else {
        return key;
    };
    if start + BEGIN.len() > end {
        return key;
    }

    let body: Vec<char> = key[start + BEGIN.len()..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let mut out = String::with_capacity(key.len() + 8);
    out.push_str(BEGIN);
    out.push('\n');
    for chunk in body.chunks(64) {
        out.extend(chunk);
        out.push('\n');
    }
    out.push_str(END);
    out.push('\n');
    out
}
