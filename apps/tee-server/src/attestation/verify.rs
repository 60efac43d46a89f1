// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local verification of Nitro attestation documents.
//!
//! A document is a COSE Sign1 envelope (ES384) whose payload is a CBOR
//! map carrying the enclave measurements, the leaf certificate, and the
//! intermediate bundle. Verification:
//!
//! 1. Parse the COSE envelope and the CBOR payload.
//! 2. Walk the certificate chain leaf → intermediates → the embedded
//!    AWS Nitro root, verifying each ECDSA P-384 signature and that
//!    every certificate covers the current time.
//! 3. Verify the COSE signature with the leaf certificate's key.

use std::collections::BTreeMap;
use std::time::SystemTime;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use coset::CborSerializable;
use der::{Decode, Encode};
use p384::ecdsa::signature::Verifier;

use super::data::AttestationDocument;
use super::AttestationError;

/// AWS Nitro Attestation PKI root certificate (DER, base64).
///
/// Subject: CN=aws.nitro-enclaves, O=Amazon, OU=AWS, C=US
/// Validity: 2019-10-28 through 2049-10-28
/// Algorithm: ECDSA P-384
const AWS_NITRO_ROOT_CERT_B64: &str = "\
MIICETCCAZagAwIBAgIRAPkxdWgbkK/hHUbMtOTn+FYwCgYIKoZIzj0EAwMwSTEL\
MAkGA1UEBhMCVVMxDzANBgNVBAoMBkFtYXpvbjEMMAoGA1UECwwDQVdTMRswGQYD\
VQQDDBJhd3Mubml0cm8tZW5jbGF2ZXMwHhcNMTkxMDI4MTMyODA1WhcNNDkxMDI4\
MTQyODA1WjBJMQswCQYDVQQGEwJVUzEPMA0GA1UECgwGQW1hem9uMQwwCgYDVQQL\
DANBV1MxGzAZBgNVBAMMEmF3cy5uaXRyby1lbmNsYXZlczB2MBAGByqGSM49AgEG\
BSuBBAAiA2IABPwCVOumCMHzaHDimtqQvkY4MpJzbolL//Zy2YlES1BR5TSksfbb\
48C8WBoyt7F2Bw7eEtaaP+ohG2bnUs990d0JX28TcPQXCEPZ3BABIeTPYwEoCWZE\
h8l5YoQwTcU/9KNCMEAwDwYDVR0TAQH/BAUwAwEB/zAdBgNVHQ4EFgQUkCW1DdkF\
R+eWw5b6cp3PmanfS5YwDgYDVR0PAQH/BAQDAgGGMAoGCCqGSM49BAMDA2kAMGYC\
MQCjfy+Rocm9Xue4YnwWmNJVA44fA0P5W2OpYow9OYCVRaEevL8uO1XYru5xtMPW\
rfMCMQCi85sWBbJwKKXdS6BptQFuZbT73o/gBh1qUxl/nNr12UO8Yfwr6wPLb+6N\
IwLz3/Y=";

/// Verify an attestation document end to end and return the parsed
/// payload.
pub fn verify_attestation_document(
    document: &[u8],
) -> Result<AttestationDocument, AttestationError> {
    let cose_sign1 = coset::CoseSign1::from_slice(document)
        .map_err(|err| AttestationError::CoseParse(format!("{err:?}")))?;

    let payload = cose_sign1
        .payload
        .as_ref()
        .ok_or_else(|| AttestationError::MissingField("payload".into()))?;
    let parsed = extract_attestation_fields(payload)?;

    verify_cert_chain(&parsed.certificate, &parsed.cabundle, SystemTime::now())?;
    verify_cose_signature(&cose_sign1, &parsed.certificate)?;

    Ok(parsed)
}

/// Parse the payload without verifying anything. Test and debugging aid.
pub fn parse_attestation_payload(
    document: &[u8],
) -> Result<AttestationDocument, AttestationError> {
    let cose_sign1 = coset::CoseSign1::from_slice(document)
        .map_err(|err| AttestationError::CoseParse(format!("{err:?}")))?;
    let payload = cose_sign1
        .payload
        .as_ref()
        .ok_or_else(|| AttestationError::MissingField("payload".into()))?;
    extract_attestation_fields(payload)
}

/// Check that the document's PCR values match the expected set.
pub fn verify_pcr_values(
    document: &AttestationDocument,
    expected: &BTreeMap<u32, Vec<u8>>,
) -> bool {
    expected.iter().all(|(index, value)| {
        document
            .pcrs
            .get(index)
            .map(|actual| actual == value)
            .unwrap_or(false)
    })
}

// =============================================================================
// Chain and signature verification
// =============================================================================

fn verify_cert_chain(
    leaf_der: &[u8],
    cabundle: &[Vec<u8>],
    now: SystemTime,
) -> Result<(), AttestationError> {
    let root_der = BASE64
        .decode(AWS_NITRO_ROOT_CERT_B64)
        .map_err(|err| AttestationError::Base64(err.to_string()))?;

    // [leaf, ...intermediates, root]
    let mut chain: Vec<&[u8]> = Vec::with_capacity(cabundle.len() + 2);
    chain.push(leaf_der);
    for cert in cabundle {
        chain.push(cert);
    }
    chain.push(&root_der);

    for i in 0..chain.len() - 1 {
        let child = parse_cert(chain[i], &format!("chain[{i}]"))?;
        let parent = parse_cert(chain[i + 1], &format!("chain[{}]", i + 1))?;

        check_validity(&child, now)?;
        verify_cert_signature(&child, &parent).map_err(|err| {
            AttestationError::CertChain(format!("certificate {i} -> {}: {err}", i + 1))
        })?;
    }

    let root = parse_cert(&root_der, "root")?;
    check_validity(&root, now)?;
    verify_cert_signature(&root, &root)
        .map_err(|err| AttestationError::CertChain(format!("root self-signature: {err}")))?;

    Ok(())
}

fn parse_cert(der: &[u8], label: &str) -> Result<x509_cert::Certificate, AttestationError> {
    x509_cert::Certificate::from_der(der)
        .map_err(|err| AttestationError::CertParse(format!("{label}: {err}")))
}

fn check_validity(cert: &x509_cert::Certificate, now: SystemTime) -> Result<(), AttestationError> {
    let validity = &cert.tbs_certificate.validity;
    let not_before = validity.not_before.to_system_time();
    let not_after = validity.not_after.to_system_time();
    if now < not_before || now > not_after {
        return Err(AttestationError::CertificateExpired);
    }
    Ok(())
}

fn verify_cert_signature(
    child: &x509_cert::Certificate,
    parent: &x509_cert::Certificate,
) -> Result<(), String> {
    let spki = &parent.tbs_certificate.subject_public_key_info;
    let verifying_key = p384::ecdsa::VerifyingKey::from_sec1_bytes(
        spki.subject_public_key.raw_bytes(),
    )
    .map_err(|err| format!("failed to parse P-384 public key: {err}"))?;

    let tbs_der = child
        .tbs_certificate
        .to_der()
        .map_err(|err| format!("failed to re-encode TBSCertificate: {err}"))?;

    let signature = p384::ecdsa::DerSignature::from_bytes(child.signature.raw_bytes())
        .map_err(|err| format!("failed to decode ECDSA signature: {err}"))?;

    verifying_key
        .verify(&tbs_der, &signature)
        .map_err(|err| format!("signature verification failed: {err}"))
}

fn verify_cose_signature(
    cose_sign1: &coset::CoseSign1,
    leaf_der: &[u8],
) -> Result<(), AttestationError> {
    let leaf = parse_cert(leaf_der, "leaf")?;
    let verifying_key = p384::ecdsa::VerifyingKey::from_sec1_bytes(
        leaf.tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .raw_bytes(),
    )
    .map_err(|err| AttestationError::CertParse(format!("leaf key: {err}")))?;

    let tbs = cose_sign1.tbs_data(&[]);
    // COSE ES384 signatures are raw r || s, 96 bytes.
    let signature = p384::ecdsa::Signature::from_slice(&cose_sign1.signature)
        .map_err(|_| AttestationError::SignatureInvalid)?;

    verifying_key
        .verify(&tbs, &signature)
        .map_err(|_| AttestationError::SignatureInvalid)
}

// =============================================================================
// CBOR field extraction
// =============================================================================

type CborMap = Vec<(ciborium::Value, ciborium::Value)>;

fn extract_attestation_fields(payload: &[u8]) -> Result<AttestationDocument, AttestationError> {
    let value: ciborium::Value = ciborium::from_reader(payload)
        .map_err(|err| AttestationError::CborParse(err.to_string()))?;
    let ciborium::Value::Map(map) = &value else {
        return Err(AttestationError::CborParse("payload is not a CBOR map".into()));
    };

    Ok(AttestationDocument {
        module_id: text_field(map, "module_id")?,
        digest: text_field(map, "digest")?,
        timestamp: integer_field(map, "timestamp")?,
        pcrs: pcrs_field(map)?,
        certificate: bytes_field(map, "certificate")?,
        cabundle: bytes_array_field(map, "cabundle")?,
        public_key: optional_bytes_field(map, "public_key"),
        user_data: optional_bytes_field(map, "user_data"),
        nonce: optional_bytes_field(map, "nonce"),
    })
}

fn find_field<'a>(map: &'a CborMap, key: &str) -> Option<&'a ciborium::Value> {
    map.iter().find_map(|(k, v)| match k {
        ciborium::Value::Text(text) if text == key => Some(v),
        _ => None,
    })
}

fn text_field(map: &CborMap, key: &str) -> Result<String, AttestationError> {
    match find_field(map, key) {
        Some(ciborium::Value::Text(text)) => Ok(text.clone()),
        Some(_) => Err(AttestationError::CborParse(format!("field '{key}' is not text"))),
        None => Err(AttestationError::MissingField(key.into())),
    }
}

fn integer_field(map: &CborMap, key: &str) -> Result<u64, AttestationError> {
    match find_field(map, key) {
        Some(ciborium::Value::Integer(int)) => {
            let value: i128 = (*int).into();
            Ok(value as u64)
        }
        Some(_) => Err(AttestationError::CborParse(format!(
            "field '{key}' is not an integer"
        ))),
        None => Err(AttestationError::MissingField(key.into())),
    }
}

fn bytes_field(map: &CborMap, key: &str) -> Result<Vec<u8>, AttestationError> {
    match find_field(map, key) {
        Some(ciborium::Value::Bytes(bytes)) => Ok(bytes.clone()),
        Some(_) => Err(AttestationError::CborParse(format!(
            "field '{key}' is not a byte string"
        ))),
        None => Err(AttestationError::MissingField(key.into())),
    }
}

fn optional_bytes_field(map: &CborMap, key: &str) -> Option<Vec<u8>> {
    match find_field(map, key) {
        Some(ciborium::Value::Bytes(bytes)) => Some(bytes.clone()),
        _ => None,
    }
}

fn bytes_array_field(map: &CborMap, key: &str) -> Result<Vec<Vec<u8>>, AttestationError> {
    match find_field(map, key) {
        Some(ciborium::Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                ciborium::Value::Bytes(bytes) => Ok(bytes.clone()),
                _ => Err(AttestationError::CborParse(format!(
                    "field '{key}' has a non-bytes element"
                ))),
            })
            .collect(),
        Some(_) => Err(AttestationError::CborParse(format!(
            "field '{key}' is not an array"
        ))),
        None => Err(AttestationError::MissingField(key.into())),
    }
}

fn pcrs_field(map: &CborMap) -> Result<BTreeMap<u32, Vec<u8>>, AttestationError> {
    let Some(ciborium::Value::Map(pcr_map)) = find_field(map, "pcrs") else {
        return Err(AttestationError::MissingField("pcrs".into()));
    };
    let mut out = BTreeMap::new();
    for (key, value) in pcr_map {
        let index = match key {
            ciborium::Value::Integer(int) => {
                let value: i128 = (*int).into();
                value as u32
            }
            _ => return Err(AttestationError::CborParse("PCR index is not an integer".into())),
        };
        let bytes = match value {
            ciborium::Value::Bytes(bytes) => bytes.clone(),
            _ => return Err(AttestationError::CborParse("PCR value is not bytes".into())),
        };
        out.insert(index, bytes);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use p384::ecdsa::signature::Signer;
    use p384::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    /// Build a COSE Sign1 attestation document self-signed with a fresh
    /// P-384 key, mirroring the structure the real device emits.
    fn test_document(
        public_key: Option<&[u8]>,
        user_data: Option<&[u8]>,
        nonce: Option<&[u8]>,
    ) -> Vec<u8> {
        let signing_key = SigningKey::random(&mut OsRng);
        let cert_der = self_signed_cert(&signing_key);

        let mut pcrs = Vec::new();
        for i in 0..3u32 {
            pcrs.push((
                ciborium::Value::Integer(i.into()),
                ciborium::Value::Bytes(vec![0u8; 48]),
            ));
        }

        let mut payload: CborMap = vec![
            (
                ciborium::Value::Text("module_id".into()),
                ciborium::Value::Text("test-enclave".into()),
            ),
            (
                ciborium::Value::Text("digest".into()),
                ciborium::Value::Text("SHA384".into()),
            ),
            (
                ciborium::Value::Text("timestamp".into()),
                ciborium::Value::Integer(1_700_000_000_000u64.into()),
            ),
            (ciborium::Value::Text("pcrs".into()), ciborium::Value::Map(pcrs)),
            (
                ciborium::Value::Text("certificate".into()),
                ciborium::Value::Bytes(cert_der),
            ),
            (
                ciborium::Value::Text("cabundle".into()),
                ciborium::Value::Array(vec![]),
            ),
        ];
        for (key, value) in [
            ("public_key", public_key),
            ("user_data", user_data),
            ("nonce", nonce),
        ] {
            payload.push((
                ciborium::Value::Text(key.into()),
                match value {
                    Some(bytes) => ciborium::Value::Bytes(bytes.to_vec()),
                    None => ciborium::Value::Null,
                },
            ));
        }

        let mut payload_bytes = Vec::new();
        ciborium::into_writer(&ciborium::Value::Map(payload), &mut payload_bytes).unwrap();

        let mut cose_sign1 = coset::CoseSign1Builder::new()
            .protected(
                coset::HeaderBuilder::new()
                    .algorithm(coset::iana::Algorithm::ES384)
                    .build(),
            )
            .payload(payload_bytes)
            .build();

        let tbs = cose_sign1.tbs_data(&[]);
        let signature: p384::ecdsa::Signature = signing_key.sign(&tbs);
        cose_sign1.signature = signature.to_bytes().to_vec();
        cose_sign1.to_vec().unwrap()
    }

    fn self_signed_cert(signing_key: &SigningKey) -> Vec<u8> {
        use der::asn1::{BitString, GeneralizedTime, ObjectIdentifier};
        use x509_cert::certificate::Version;
        use x509_cert::serial_number::SerialNumber;
        use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
        use x509_cert::time::{Time, Validity};

        let verifying_key = signing_key.verifying_key();
        let pubkey_sec1 = verifying_key.to_sec1_bytes();

        let spki = SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned {
                oid: ObjectIdentifier::new_unwrap("1.2.840.10045.2.1"),
                parameters: Some(der::Any::from(&ObjectIdentifier::new_unwrap(
                    "1.3.132.0.34",
                ))),
            },
            subject_public_key: BitString::from_bytes(&pubkey_sec1).unwrap(),
        };

        let sig_alg = AlgorithmIdentifierOwned {
            oid: ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3"),
            parameters: None,
        };

        let validity = Validity {
            not_before: Time::GeneralTime(
                GeneralizedTime::from_date_time(der::DateTime::new(2020, 1, 1, 0, 0, 0).unwrap()),
            ),
            not_after: Time::GeneralTime(
                GeneralizedTime::from_date_time(
                    der::DateTime::new(2049, 12, 31, 23, 59, 59).unwrap(),
                ),
            ),
        };

        let tbs = x509_cert::TbsCertificate {
            version: Version::V3,
            serial_number: SerialNumber::new(&[1]).unwrap(),
            signature: sig_alg.clone(),
            issuer: x509_cert::name::Name::default(),
            validity,
            subject: x509_cert::name::Name::default(),
            subject_public_key_info: spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: None,
        };

        let tbs_der = tbs.to_der().unwrap();
        let signature: p384::ecdsa::DerSignature = signing_key.sign(&tbs_der);
        let cert = x509_cert::Certificate {
            tbs_certificate: tbs,
            signature_algorithm: sig_alg,
            signature: BitString::from_bytes(signature.as_bytes()).unwrap(),
        };
        cert.to_der().unwrap()
    }

    #[test]
    fn parses_payload_fields() {
        let doc = test_document(Some(&[1u8; 32]), Some(&[2u8; 32]), Some(&[3u8; 8]));
        let parsed = parse_attestation_payload(&doc).unwrap();

        assert_eq!(parsed.module_id, "test-enclave");
        assert_eq!(parsed.digest, "SHA384");
        assert_eq!(parsed.timestamp, 1_700_000_000_000);
        assert_eq!(parsed.pcrs.len(), 3);
        assert_eq!(parsed.pcrs[&0], vec![0u8; 48]);
        assert_eq!(parsed.public_key, Some(vec![1u8; 32]));
        assert_eq!(parsed.user_data, Some(vec![2u8; 32]));
        assert_eq!(parsed.nonce, Some(vec![3u8; 8]));
    }

    #[test]
    fn cose_signature_verifies_against_the_embedded_leaf() {
        let doc = test_document(Some(&[1u8; 32]), None, None);
        let cose_sign1 = coset::CoseSign1::from_slice(&doc).unwrap();
        let parsed = extract_attestation_fields(cose_sign1.payload.as_ref().unwrap()).unwrap();

        assert!(verify_cose_signature(&cose_sign1, &parsed.certificate).is_ok());
    }

    #[test]
    fn tampered_payload_fails_cose_verification() {
        let doc = test_document(Some(&[1u8; 32]), None, None);
        let mut cose_sign1 = coset::CoseSign1::from_slice(&doc).unwrap();
        let parsed = extract_attestation_fields(cose_sign1.payload.as_ref().unwrap()).unwrap();

        let mut payload = cose_sign1.payload.take().unwrap();
        *payload.last_mut().unwrap() ^= 0xff;
        cose_sign1.payload = Some(payload);

        assert!(matches!(
            verify_cose_signature(&cose_sign1, &parsed.certificate),
            Err(AttestationError::SignatureInvalid)
        ));
    }

    #[test]
    fn self_signed_cert_round_trips() {
        let key = SigningKey::random(&mut OsRng);
        let der = self_signed_cert(&key);
        let cert = x509_cert::Certificate::from_der(&der).unwrap();
        assert!(verify_cert_signature(&cert, &cert).is_ok());
    }

    #[test]
    fn validity_window_is_enforced() {
        let key = SigningKey::random(&mut OsRng);
        let der = self_signed_cert(&key);
        let cert = x509_cert::Certificate::from_der(&der).unwrap();

        assert!(check_validity(&cert, SystemTime::now()).is_ok());

        let before_epoch = SystemTime::UNIX_EPOCH;
        assert!(matches!(
            check_validity(&cert, before_epoch),
            Err(AttestationError::CertificateExpired)
        ));
    }

    #[test]
    fn aws_root_certificate_decodes_and_self_verifies() {
        let root_der = BASE64.decode(AWS_NITRO_ROOT_CERT_B64).unwrap();
        let root = x509_cert::Certificate::from_der(&root_der).unwrap();
        assert!(verify_cert_signature(&root, &root).is_ok());
    }

    #[test]
    fn pcr_comparison() {
        let doc = test_document(None, None, None);
        let parsed = parse_attestation_payload(&doc).unwrap();

        let mut expected = BTreeMap::new();
        expected.insert(0u32, vec![0u8; 48]);
        expected.insert(1u32, vec![0u8; 48]);
        assert!(verify_pcr_values(&parsed, &expected));

        expected.insert(2u32, vec![1u8; 48]);
        assert!(!verify_pcr_values(&parsed, &expected));
    }
}
