// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AWS plumbing: region catalogue, credential sourcing (static config or
//! IMDSv2), SigV4 request signing, and the Secrets Manager client. All
//! network traffic flows through the vsock transports.

pub mod credentials;
pub mod region;
pub mod secrets;
pub mod sigv4;

use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum AwsError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("API error {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("secret does not contain string data")]
    MalformedSecret,
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("could not fetch aws credentials from config file")]
    MissingCredentials,
    #[error("instance metadata error: {0}")]
    Metadata(String),
    #[error("failed to build request: {0}")]
    Http(#[from] http::Error),
}
