// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Secrets Manager client
//!
//! Signs `GetSecretValue` calls with SigV4 and sends them through the
//! vsock-tunneled TLS transport. Credentials come from the local config
//! in `local`, and from the instance-metadata service everywhere else.

use chrono::Utc;
use http::Request;
use http_body_util::Full;
use hyper::body::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::credentials::{fetch_instance_credentials, AwsCredentials};
use super::region::AwsRegion;
use super::sigv4::{sign_request, SigningParams};
use super::AwsError;
use crate::config::{Environment, TeeConfig};
use crate::transport::{VsockHttpClient, VsockTlsHttpClient};

const SERVICE: &str = "secretsmanager";

/// Request payload for `GetSecretValue`.
#[derive(Serialize)]
struct GetSecretValueRequest<'a> {
    #[serde(rename = "SecretId")]
    secret_id: &'a str,
}

/// Response payload for `GetSecretValue`.
#[derive(Debug, Clone, Deserialize)]
pub struct GetSecretValueResponse {
    #[serde(rename = "ARN", default)]
    pub arn: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "SecretString", default)]
    pub secret_string: String,
    #[serde(rename = "VersionId", default)]
    pub version_id: String,
    #[serde(rename = "VersionStages", default)]
    pub version_stages: Vec<String>,
}

/// Client for the cloud secret store.
pub struct SecretsManager {
    client: VsockTlsHttpClient,
    credentials: AwsCredentials,
    region: AwsRegion,
}

impl SecretsManager {
    /// Build a client for the given TEE config, resolving credentials by
    /// environment: static YAML credentials in `local`, IMDSv2 elsewhere.
    pub async fn bootstrap(cfg: &TeeConfig) -> Result<Self, AwsError> {
        let region = cfg.region.clone();
        let host = format!("secretsmanager.{region}.amazonaws.com");
        let client = VsockTlsHttpClient::new(cfg.ports.aws_secret_manager_vsock_port, &host)?;

        let credentials = match cfg.environment {
            Environment::Local => {
                let file_creds = cfg
                    .aws_credentials
                    .as_ref()
                    .ok_or(AwsError::MissingCredentials)?;
                AwsCredentials::from_config(file_creds)?
            }
            _ => {
                info!("fetching ec2 credentials");
                let imds = VsockHttpClient::new(cfg.ports.ec2_creds_vsock_port);
                fetch_instance_credentials(&imds).await?
            }
        };

        Ok(Self {
            client,
            credentials,
            region,
        })
    }

    fn endpoint_host(&self) -> String {
        format!("secretsmanager.{}.amazonaws.com", self.region)
    }

    /// Retrieve a secret by name.
    pub async fn get_secret(&self, name: &str) -> Result<GetSecretValueResponse, AwsError> {
        let payload = serde_json::to_vec(&GetSecretValueRequest { secret_id: name })?;
        let host = self.endpoint_host();

        let signed = sign_request(
            "POST",
            "/",
            "",
            &host,
            &[
                ("content-type", "application/x-amz-json-1.1"),
                ("x-amz-target", "secretsmanager.GetSecretValue"),
            ],
            &payload,
            &SigningParams {
                credentials: &self.credentials,
                region: self.region.as_str(),
                service: SERVICE,
                time: Utc::now(),
            },
        );

        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("https://{host}/"))
            .header("Authorization", &signed.authorization);
        for (header, value) in &signed.headers {
            builder = builder.header(header.as_str(), value.as_str());
        }
        let req = builder.body(Full::new(Bytes::from(payload)))?;

        let response = self.client.request(req).await?;
        if !response.status.is_success() {
            return Err(AwsError::Upstream {
                status: response.status.as_u16(),
                body: response.text(),
            });
        }

        let secret: GetSecretValueResponse = response.json()?;
        if secret.secret_string.is_empty() {
            return Err(AwsError::MalformedSecret);
        }

        info!(name, "fetched secret from secrets manager");
        Ok(secret)
    }

    /// Fetch a secret and JSON-decode it into a config type.
    ///
    /// The store sometimes hands back port numbers as strings; any string
    /// value under a key containing "port" that parses as an integer is
    /// coerced before decoding.
    pub async fn load_config<T: DeserializeOwned>(&self, name: &str) -> Result<T, AwsError> {
        let secret = self.get_secret(name).await?;
        let mut value: Value = serde_json::from_str(&secret.secret_string)?;
        coerce_string_ports(&mut value);
        Ok(serde_json::from_value(value)?)
    }
}

fn coerce_string_ports(value: &mut Value) {
    if let Value::Object(map) = value {
        for (key, entry) in map.iter_mut() {
            if !key.contains("port") {
                continue;
            }
            if let Value::String(raw) = entry {
                if let Ok(parsed) = raw.parse::<i64>() {
                    *entry = Value::Number(parsed.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct PortsSecret {
        router_vsock_port: u32,
        name: String,
    }

    #[test]
    fn coerces_string_ports_to_integers() {
        let mut value: Value = serde_json::from_str(
            r#"{"router_vsock_port": "50003", "name": "tee", "other": "7"}"#,
        )
        .unwrap();
        coerce_string_ports(&mut value);

        let decoded: PortsSecret = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(
            decoded,
            PortsSecret {
                router_vsock_port: 50003,
                name: "tee".into()
            }
        );
        // Non-port keys are untouched even when numeric.
        assert_eq!(value["other"], Value::String("7".into()));
    }

    #[test]
    fn leaves_unparseable_port_strings_alone() {
        let mut value: Value =
            serde_json::from_str(r#"{"router_vsock_port": "not-a-number"}"#).unwrap();
        coerce_string_ports(&mut value);
        assert_eq!(value["router_vsock_port"], Value::String("not-a-number".into()));
    }

    #[test]
    fn get_secret_response_decodes() {
        let body = r#"{
            "ARN": "arn:aws:secretsmanager:us-east-2:123:secret:dev/privy",
            "Name": "dev/privy",
            "SecretString": "{\"app_id\":\"app\"}",
            "VersionId": "v1",
            "VersionStages": ["AWSCURRENT"]
        }"#;
        let secret: GetSecretValueResponse = serde_json::from_str(body).unwrap();
        assert_eq!(secret.name, "dev/privy");
        assert_eq!(secret.secret_string, r#"{"app_id":"app"}"#);
        assert_eq!(secret.version_stages, vec!["AWSCURRENT"]);
    }
}
