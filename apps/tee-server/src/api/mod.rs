// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface served over the vsock ingress listener.
//!
//! Handlers are thin adapters: extract auth, bind and validate the JSON
//! body, dispatch to the signing client, encode the result. All error
//! payloads are `{"message": ...}`.

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::ApiError;
use crate::state::AppState;

pub mod attest;
pub mod batch;
pub mod health;
pub mod sign;
pub mod user;

/// Header carrying the caller's credential: a bearer JWT on user routes,
/// an HMAC hex signature on the orchestrator's single-sign route.
pub const AUTH_HEADER: &str = "auth";

/// Extract the `auth` header or fail with the standard 401 payload.
pub(crate) fn auth_header(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| {
            error!("request is missing the auth header");
            ApiError::unauthorized()
        })
}

/// Build the full route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/user/signer/eth/secp256k1Sign",
            post(sign::user_secp256k1_sign),
        )
        .route("/api/v1/user", get(user::get_user))
        .route(
            "/api/v1/axal/signer/eth/secp256k1Sign",
            post(sign::axal_secp256k1_sign),
        )
        .route(
            "/api/v1/axal/signer/eth/secp256k1SignBatch",
            post(batch::axal_batch_secp256k1_sign),
        )
        .route("/api/v1/attest/bytes/{nonce}", get(attest::attestation_bytes))
        .route("/api/v1/attest/doc/{nonce}", get(attest::attestation_doc))
        .route("/api/v1/health/ping", get(health::ping))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
