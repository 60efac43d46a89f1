// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Parsed attestation document and the HTTP response shapes.
//!
//! Byte fields serialize as lowercase hex strings so the JSON form stays
//! readable and copy-pasteable into verification tooling.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// The payload of a verified attestation document.
#[derive(Debug, Clone, Serialize)]
pub struct AttestationDocument {
    pub module_id: String,
    pub digest: String,
    /// Document creation time, Unix milliseconds.
    pub timestamp: u64,
    #[serde(serialize_with = "hex_map")]
    pub pcrs: BTreeMap<u32, Vec<u8>>,
    #[serde(serialize_with = "hex_bytes")]
    pub certificate: Vec<u8>,
    #[serde(serialize_with = "hex_list")]
    pub cabundle: Vec<Vec<u8>>,
    #[serde(serialize_with = "hex_opt")]
    pub public_key: Option<Vec<u8>>,
    #[serde(serialize_with = "hex_opt")]
    pub user_data: Option<Vec<u8>>,
    #[serde(serialize_with = "hex_opt")]
    pub nonce: Option<Vec<u8>>,
}

/// Response for the raw-bytes attestation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AttestationBytesResponse {
    pub attestation: String,
}

/// Response for the verified-document attestation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AttestationDocResponse {
    pub attestation_doc: AttestationDocument,
}

fn hex_bytes<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

fn hex_opt<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
        None => serializer.serialize_none(),
    }
}

fn hex_list<S: Serializer>(list: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(list.iter().map(hex::encode))
}

fn hex_map<S: Serializer>(
    map: &BTreeMap<u32, Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    // JSON object keys are strings; stringify the PCR indices.
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (index, value) in map {
        out.serialize_entry(&index.to_string(), &hex::encode(value))?;
    }
    out.end()
}
