// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential sourcing
//!
//! Two strategies, dispatched by environment:
//!
//! - `local`: static access key pair from the YAML config.
//! - `dev` / `staging` / `prod`: temporary credentials from the
//!   instance-metadata service via IMDSv2, reached over the plain vsock
//!   HTTP transport. The session token from IMDS flows into every
//!   subsequent SigV4 request as `X-Amz-Security-Token`.

use std::fmt;

use http::Request;
use http_body_util::Full;
use hyper::body::Bytes;
use serde::Deserialize;

use super::AwsError;
use crate::config::AwsCredentialsConfig;
use crate::transport::VsockHttpClient;

const IMDS_TOKEN_URL: &str = "http://169.254.169.254/latest/api/token";
const IMDS_ROLE_URL: &str = "http://169.254.169.254/latest/meta-data/iam/security-credentials/";

/// IMDSv2 session token lifetime requested by the enclave.
const IMDS_TOKEN_TTL_SECONDS: &str = "21600";

/// AWS credentials used to sign Secrets Manager requests.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key: String,
    pub access_secret: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key", &self.access_key)
            .field("access_secret", &format_args!("<{} bytes>", self.access_secret.len()))
            .field("session_token", &self.session_token.as_ref().map(|t| t.len()))
            .finish()
    }
}

impl AwsCredentials {
    /// Build from the static local-development config section.
    pub fn from_config(cfg: &AwsCredentialsConfig) -> Result<Self, AwsError> {
        if cfg.access_key.is_empty() || cfg.access_secret.is_empty() {
            return Err(AwsError::MissingCredentials);
        }
        Ok(Self {
            access_key: cfg.access_key.clone(),
            access_secret: cfg.access_secret.clone(),
            session_token: cfg.session_token.clone(),
        })
    }
}

/// Temporary credential document returned by the metadata service.
#[derive(Deserialize)]
struct Ec2Credentials {
    #[serde(rename = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "Token")]
    token: String,
    #[serde(rename = "Expiration", default)]
    #[allow(dead_code)]
    expiration: String,
}

/// Fetch temporary role credentials from the instance-metadata service.
///
/// Three round-trips, all over the host's metadata-proxy vsock port:
/// session token, role name, then the credential document for that role.
pub async fn fetch_instance_credentials(
    client: &VsockHttpClient,
) -> Result<AwsCredentials, AwsError> {
    // IMDSv2 session token
    let req = Request::builder()
        .method("PUT")
        .uri(IMDS_TOKEN_URL)
        .header("X-aws-ec2-metadata-token-ttl-seconds", IMDS_TOKEN_TTL_SECONDS)
        .body(Full::new(Bytes::new()))?;
    let response = client.request(req).await?;
    if !response.status.is_success() {
        return Err(AwsError::Metadata(format!(
            "failed to get metadata token, status: {}",
            response.status.as_u16()
        )));
    }
    let token = response.text();

    // IAM role name
    let req = Request::builder()
        .method("GET")
        .uri(IMDS_ROLE_URL)
        .header("X-aws-ec2-metadata-token", token.as_str())
        .body(Full::new(Bytes::new()))?;
    let response = client.request(req).await?;
    if !response.status.is_success() {
        return Err(AwsError::Metadata(format!(
            "failed to get IAM role, status: {}",
            response.status.as_u16()
        )));
    }
    let role = response.text();
    let role = role.trim();

    // Credentials for the role
    let req = Request::builder()
        .method("GET")
        .uri(format!("{IMDS_ROLE_URL}{role}"))
        .header("X-aws-ec2-metadata-token", token.as_str())
        .body(Full::new(Bytes::new()))?;
    let response = client.request(req).await?;
    if !response.status.is_success() {
        return Err(AwsError::Metadata(format!(
            "failed to get credentials, status: {}",
            response.status.as_u16()
        )));
    }
    let creds: Ec2Credentials = response.json()?;

    Ok(AwsCredentials {
        access_key: creds.access_key_id,
        access_secret: creds.secret_access_key,
        session_token: Some(creds.token),
    })
}
