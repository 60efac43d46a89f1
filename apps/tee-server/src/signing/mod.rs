// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical-JSON authorization-envelope signing and scoped handling of
//! the key material involved.

pub mod envelope;
pub mod secure;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("failed to decode PKCS8 key: {0}")]
    KeyDecode(base64::DecodeError),
    #[error("key provided is not an ECDSA P-256 private key")]
    NotP256,
    #[error("failed to canonicalize payload: {0}")]
    Canonicalize(serde_json::Error),
    #[error("failed to decode signature: {0}")]
    SignatureDecode(String),
    #[error("signature verification failed")]
    VerificationFailed,
}
