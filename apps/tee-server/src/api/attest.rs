// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Attestation endpoints.
//!
//! The path nonce is an unsigned 64-bit decimal, serialized
//! little-endian into an 8-byte buffer before it reaches the device, so
//! callers can recover it from the document byte-for-byte.

use axum::extract::Path;
use axum::Json;
use tracing::error;

use crate::attestation::data::{AttestationBytesResponse, AttestationDocResponse};
use crate::attestation::{attest, attest_and_verify};
use crate::error::ApiError;

fn nonce_buffer(raw: &str) -> Result<[u8; 8], ApiError> {
    let nonce: u64 = raw.parse().map_err(|_| {
        error!("invalid nonce provided, could not parse to int");
        ApiError::bad_request("nonce is invalid")
    })?;
    Ok(nonce.to_le_bytes())
}

/// GET /api/v1/attest/bytes/{nonce}. The raw attestation document,
/// hex-encoded and unverified.
pub async fn attestation_bytes(
    Path(nonce): Path<String>,
) -> Result<Json<AttestationBytesResponse>, ApiError> {
    let buf = nonce_buffer(&nonce)?;

    let document = attest(&buf, &[], &[]).map_err(|err| {
        error!(error = %err, "unable to generate attestation");
        ApiError::internal()
    })?;

    Ok(Json(AttestationBytesResponse {
        attestation: hex::encode(document),
    }))
}

/// GET /api/v1/attest/doc/{nonce}. The attestation document, verified
/// against the platform root and returned parsed.
pub async fn attestation_doc(
    Path(nonce): Path<String>,
) -> Result<Json<AttestationDocResponse>, ApiError> {
    let buf = nonce_buffer(&nonce)?;

    let document = attest_and_verify(&buf, &[], &[]).map_err(|err| {
        error!(error = %err, "unable to generate verified attestation");
        ApiError::internal()
    })?;

    Ok(Json(AttestationDocResponse {
        attestation_doc: document,
    }))
}
