// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # AWS Signature Version 4
//!
//! Hand-rolled SigV4 signing for the one AWS API the enclave talks to.
//! The algorithm follows the reference exactly:
//!
//! 1. Canonical request:
//!    `METHOD\nURI\nQUERY\nHEADERS\nSIGNED_HEADERS\nHEX(SHA256(body))`,
//!    headers lower-cased and sorted.
//! 2. String to sign:
//!    `AWS4-HMAC-SHA256\n<amz-date>\n<date>/<region>/<service>/aws4_request\nHEX(SHA256(canonical))`.
//! 3. Key chain: `kDate = HMAC("AWS4"+secret, date)`, then region,
//!    service, `aws4_request`.
//! 4. `Authorization: AWS4-HMAC-SHA256 Credential=..., SignedHeaders=..., Signature=...`.
//!
//! When a session token is present it is signed as
//! `x-amz-security-token`, as required for temporary credentials.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::credentials::AwsCredentials;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const TERMINATION: &str = "aws4_request";

type HmacSha256 = Hmac<Sha256>;

/// Everything SigV4 needs besides the request itself.
pub struct SigningParams<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

/// The signed header set: every header that participated in the
/// signature (and therefore must be sent verbatim), plus the
/// `Authorization` value.
pub struct SignedRequest {
    pub headers: BTreeMap<String, String>,
    pub authorization: String,
}

/// Sign one request. `extra_headers` are included in the canonical
/// header set alongside the generated `host` and `x-amz-date`.
pub fn sign_request(
    method: &str,
    path: &str,
    query: &str,
    host: &str,
    extra_headers: &[(&str, &str)],
    payload: &[u8],
    params: &SigningParams<'_>,
) -> SignedRequest {
    let amz_date = params.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = params.time.format("%Y%m%d").to_string();

    // Canonical headers, lower-cased and sorted by the BTreeMap.
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    headers.insert("host".into(), host.trim().to_owned());
    headers.insert("x-amz-date".into(), amz_date.clone());
    for (name, value) in extra_headers {
        headers.insert(name.to_lowercase(), value.trim().to_owned());
    }
    if let Some(token) = &params.credentials.session_token {
        headers.insert("x-amz-security-token".into(), token.clone());
    }

    let canonical_uri = if path.is_empty() { "/" } else { path };
    let mut canonical_headers = String::new();
    for (name, value) in &headers {
        canonical_headers.push_str(name);
        canonical_headers.push(':');
        canonical_headers.push_str(value);
        canonical_headers.push('\n');
    }
    let signed_headers = headers
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");
    let payload_hash = sha256_hex(payload);

    let canonical_request = format!(
        "{method}\n{canonical_uri}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    );

    let credential_scope = format!(
        "{date_stamp}/{}/{}/{TERMINATION}",
        params.region, params.service
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(
        &params.credentials.access_secret,
        &date_stamp,
        params.region,
        params.service,
    );
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
        params.credentials.access_key
    );

    SignedRequest {
        headers,
        authorization,
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// The SigV4 derived-key chain.
fn derive_signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, TERMINATION.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// The worked example from the AWS SigV4 documentation
    /// (GET iam ListUsers, 2015-08-30T12:36:00Z, us-east-1).
    #[test]
    fn matches_aws_reference_vector() {
        let credentials = AwsCredentials {
            access_key: "AKIDEXAMPLE".into(),
            access_secret: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            session_token: None,
        };
        let params = SigningParams {
            credentials: &credentials,
            region: "us-east-1",
            service: "iam",
            time: Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap(),
        };

        let signed = sign_request(
            "GET",
            "/",
            "Action=ListUsers&Version=2010-05-08",
            "iam.amazonaws.com",
            &[(
                "Content-Type",
                "application/x-www-form-urlencoded; charset=utf-8",
            )],
            b"",
            &params,
        );

        assert_eq!(
            signed.authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, \
             Signature=5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
        );
    }

    #[test]
    fn signing_is_deterministic() {
        let credentials = AwsCredentials {
            access_key: "AKIDEXAMPLE".into(),
            access_secret: "secret".into(),
            session_token: None,
        };
        let params = SigningParams {
            credentials: &credentials,
            region: "us-east-2",
            service: "secretsmanager",
            time: Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap(),
        };

        let a = sign_request(
            "POST",
            "/",
            "",
            "secretsmanager.us-east-2.amazonaws.com",
            &[("content-type", "application/x-amz-json-1.1")],
            br#"{"SecretId":"dev/privy"}"#,
            &params,
        );
        let b = sign_request(
            "POST",
            "/",
            "",
            "secretsmanager.us-east-2.amazonaws.com",
            &[("content-type", "application/x-amz-json-1.1")],
            br#"{"SecretId":"dev/privy"}"#,
            &params,
        );
        assert_eq!(a.authorization, b.authorization);
    }

    #[test]
    fn session_token_joins_the_signed_headers() {
        let credentials = AwsCredentials {
            access_key: "ASIAEXAMPLE".into(),
            access_secret: "secret".into(),
            session_token: Some("session-token".into()),
        };
        let params = SigningParams {
            credentials: &credentials,
            region: "us-east-2",
            service: "secretsmanager",
            time: Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap(),
        };

        let signed = sign_request(
            "POST",
            "/",
            "",
            "secretsmanager.us-east-2.amazonaws.com",
            &[("content-type", "application/x-amz-json-1.1")],
            b"{}",
            &params,
        );
        assert!(signed
            .authorization
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token"));
        assert_eq!(
            signed.headers.get("x-amz-security-token").map(String::as_str),
            Some("session-token")
        );
    }

    #[test]
    fn key_chain_matches_reference_derivation() {
        // Derived signing key from the AWS documentation example.
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20150830",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }
}
