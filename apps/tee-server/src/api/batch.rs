// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Batch signing handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::error;

use crate::error::ApiError;
use crate::privy::data::{BatchSignRequest, BatchSignResponse};
use crate::state::AppState;

/// Header carrying the orchestrator's HMAC for the batch route.
pub const HMAC_SIGNATURE_HEADER: &str = "hmac-signature";

/// POST /api/v1/axal/signer/eth/secp256k1SignBatch. HMAC auth, one
/// signature for the whole batch.
pub async fn axal_batch_secp256k1_sign(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BatchSignRequest>, JsonRejection>,
) -> Result<Json<BatchSignResponse>, ApiError> {
    let signature = headers
        .get(HMAC_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| {
            error!("axal batch sign: missing hmac signature");
            ApiError::unauthorized()
        })?;

    let Ok(Json(batch)) = body else {
        error!("axal batch sign: request body did not bind");
        return Err(ApiError::bad_request("batch request data is invalid"));
    };
    if let Err(err) = batch.validate() {
        error!(error = %err, "axal batch sign: validation failed");
        return Err(ApiError::bad_request("batch request validation failed"));
    }

    let response = state
        .privy
        .axal_batch_secp256k1_sign(&batch, &signature)
        .await?;
    Ok(Json(response))
}
