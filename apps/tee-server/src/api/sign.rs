// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing handlers: extract auth, bind and validate the body, dispatch
//! to the signing client, encode the result. Error payloads are the
//! fixed `{"message": ...}` shapes.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::error;

use super::auth_header;
use crate::error::ApiError;
use crate::privy::data::{AxalSecp256k1SignRequest, Secp256k1SignRequest, Secp256k1SignResponse};
use crate::state::AppState;

/// POST /api/v1/user/signer/eth/secp256k1Sign. JWT auth.
pub async fn user_secp256k1_sign(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Secp256k1SignRequest>, JsonRejection>,
) -> Result<Json<Secp256k1SignResponse>, ApiError> {
    let auth = auth_header(&headers)?;

    let Ok(Json(request)) = body else {
        error!("user secp256k1 sign: request body did not bind");
        return Err(ApiError::bad_request("tx data is invalid"));
    };
    if let Err(err) = request.validate() {
        error!(error = %err, "user secp256k1 sign: tx data is invalid");
        return Err(ApiError::bad_request("tx data is invalid"));
    }

    let response = state.privy.user_secp256k1_sign(&auth, &request).await?;
    Ok(Json(response))
}

/// POST /api/v1/axal/signer/eth/secp256k1Sign. HMAC auth.
pub async fn axal_secp256k1_sign(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AxalSecp256k1SignRequest>, JsonRejection>,
) -> Result<Json<Secp256k1SignResponse>, ApiError> {
    let auth = auth_header(&headers)?;

    let Ok(Json(request)) = body else {
        error!("axal secp256k1 sign: request body did not bind");
        return Err(ApiError::bad_request("tx data is invalid"));
    };
    if let Err(err) = request.validate() {
        error!(error = %err, "axal secp256k1 sign: tx data is invalid");
        return Err(ApiError::bad_request("tx data is invalid"));
    }

    let response = state.privy.axal_secp256k1_sign(&auth, &request).await?;
    Ok(Json(response))
}
