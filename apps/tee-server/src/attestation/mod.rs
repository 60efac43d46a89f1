// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Remote attestation
//!
//! The Nitro Security Module produces CBOR/COSE attestation documents
//! binding the enclave's measurements to caller-supplied data. Two
//! operations are exposed:
//!
//! - [`attest`]: open a device session, request a document over
//!   `(nonce, user_data, public_key)`, return the raw COSE bytes.
//! - [`attest_and_verify`]: additionally verify the document locally:
//!   certificate chain up to the AWS Nitro root (validity checked
//!   against the current time) and the ES384 COSE signature.
//!
//! Sessions are scoped to a single call and closed before returning,
//! success or not.

pub mod data;
pub mod device;
pub mod verify;

pub use data::AttestationDocument;
pub use device::{NitroDevice, NsmDevice};

#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("NSM device is unavailable")]
    DeviceUnavailable,
    #[error("NSM device error: {0}")]
    Device(String),
    #[error("NSM device did not return an attestation")]
    MissingDocument,
    #[error("failed to parse COSE envelope: {0}")]
    CoseParse(String),
    #[error("failed to parse CBOR payload: {0}")]
    CborParse(String),
    #[error("attestation document is missing field: {0}")]
    MissingField(String),
    #[error("failed to parse certificate: {0}")]
    CertParse(String),
    #[error("certificate chain verification failed: {0}")]
    CertChain(String),
    #[error("certificate is outside its validity window")]
    CertificateExpired,
    #[error("COSE signature verification failed")]
    SignatureInvalid,
    #[error("failed to decode root certificate: {0}")]
    Base64(String),
}

/// Request an attestation document from the platform device.
pub fn attest(
    nonce: &[u8],
    user_data: &[u8],
    public_key: &[u8],
) -> Result<Vec<u8>, AttestationError> {
    attest_with(&NitroDevice, nonce, user_data, public_key)
}

/// Request an attestation document from a specific device handle.
pub fn attest_with(
    device: &dyn NsmDevice,
    nonce: &[u8],
    user_data: &[u8],
    public_key: &[u8],
) -> Result<Vec<u8>, AttestationError> {
    device.attestation_document(nonce, user_data, public_key)
}

/// Request a document and verify it against the platform root of trust,
/// returning the parsed contents.
pub fn attest_and_verify(
    nonce: &[u8],
    user_data: &[u8],
    public_key: &[u8],
) -> Result<AttestationDocument, AttestationError> {
    let document = attest(nonce, user_data, public_key)?;
    verify::verify_attestation_document(&document)
}
