// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Error Handling
//!
//! This module provides the unified error type surfaced by all request
//! handlers. Errors are converted into JSON responses with the appropriate
//! HTTP status code.
//!
//! ## JSON Response Format
//!
//! All errors are returned as JSON with a single `message` field:
//!
//! ```json
//! { "message": "tx data is invalid" }
//! ```
//!
//! Upstream custody-provider errors keep their original status code and
//! carry the parsed `error` string from the provider's envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API error with HTTP status and message.
///
/// This type implements `IntoResponse`, allowing it to be returned directly
/// from Axum handlers. The error is serialized as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code for the response.
    pub status: StatusCode,
    /// Human-readable error message (included in JSON response).
    pub message: String,
}

/// JSON body structure for error responses.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    /// Create a new API error with the given status and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create a 401 Unauthorized error with the standard missing-auth message.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized user")
    }

    /// Create a 401 for a JWT that failed verification.
    pub fn invalid_jwt() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized User - Invalid JWT")
    }

    /// Create a 401 for an HMAC signature that failed verification.
    pub fn invalid_hmac() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized User - Invalid HMAC")
    }

    /// Create a 500 Internal Server Error.
    ///
    /// Use for unexpected server-side failures. Internal details are never
    /// exposed in the response body.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    }

    /// Create a 400 for a principal without a delegated ethereum wallet.
    pub fn no_delegated_wallet() -> Self {
        Self::bad_request("user does not have an delegated eth wallet")
    }

    /// Create an error propagating an upstream custody-provider status.
    pub fn upstream(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    /// Convert the error into an Axum HTTP response.
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}
