// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! NSM device access.
//!
//! The real device is `/dev/nsm`, driven through the Nitro NSM API. The
//! trait boundary exists so tests can run with a mock device; the
//! production path opens a fresh session per request and closes it
//! before returning.

use super::AttestationError;

/// Operations the attestation layer needs from the secure module.
pub trait NsmDevice: Send + Sync {
    /// Request an attestation document over the given fields. Empty
    /// slices are submitted as absent fields.
    fn attestation_document(
        &self,
        nonce: &[u8],
        user_data: &[u8],
        public_key: &[u8],
    ) -> Result<Vec<u8>, AttestationError>;
}

/// The production NSM device. Only functional inside a Nitro enclave on
/// Linux; anywhere else every request reports the device unavailable.
pub struct NitroDevice;

#[cfg(target_os = "linux")]
impl NsmDevice for NitroDevice {
    fn attestation_document(
        &self,
        nonce: &[u8],
        user_data: &[u8],
        public_key: &[u8],
    ) -> Result<Vec<u8>, AttestationError> {
        use aws_nitro_enclaves_nsm_api::api::{Request, Response};
        use aws_nitro_enclaves_nsm_api::driver;
        use serde_bytes::ByteBuf;

        fn field(bytes: &[u8]) -> Option<ByteBuf> {
            if bytes.is_empty() {
                None
            } else {
                Some(ByteBuf::from(bytes.to_vec()))
            }
        }

        let fd = driver::nsm_init();
        if fd < 0 {
            return Err(AttestationError::DeviceUnavailable);
        }

        let response = driver::nsm_process_request(
            fd,
            Request::Attestation {
                nonce: field(nonce),
                user_data: field(user_data),
                public_key: field(public_key),
            },
        );
        driver::nsm_exit(fd);

        match response {
            Response::Attestation { document } if !document.is_empty() => Ok(document),
            Response::Attestation { .. } => Err(AttestationError::MissingDocument),
            Response::Error(code) => Err(AttestationError::Device(format!("{code:?}"))),
            other => Err(AttestationError::Device(format!(
                "unexpected response: {other:?}"
            ))),
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl NsmDevice for NitroDevice {
    fn attestation_document(
        &self,
        _nonce: &[u8],
        _user_data: &[u8],
        _public_key: &[u8],
    ) -> Result<Vec<u8>, AttestationError> {
        Err(AttestationError::DeviceUnavailable)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    /// Test device: returns a JSON document echoing the submitted
    /// fields, with all-zero PCR values.
    pub(crate) struct MockNsm;

    impl NsmDevice for MockNsm {
        fn attestation_document(
            &self,
            nonce: &[u8],
            user_data: &[u8],
            public_key: &[u8],
        ) -> Result<Vec<u8>, AttestationError> {
            let doc = serde_json::json!({
                "module_id": "nsm-mock",
                "digest": "SHA384",
                "timestamp": 1_700_000_000_000u64,
                "pcrs": { "0": vec![0u8; 48], "1": vec![0u8; 48], "2": vec![0u8; 48] },
                "nonce": nonce,
                "user_data": user_data,
                "public_key": public_key,
            });
            Ok(serde_json::to_vec(&doc).expect("mock document serializes"))
        }
    }

    /// Test device that always fails, for error-path coverage.
    pub(crate) struct BrokenNsm;

    impl NsmDevice for BrokenNsm {
        fn attestation_document(
            &self,
            _nonce: &[u8],
            _user_data: &[u8],
            _public_key: &[u8],
        ) -> Result<Vec<u8>, AttestationError> {
            Err(AttestationError::Device("InternalError".into()))
        }
    }
}
