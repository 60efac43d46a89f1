// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request authentication
//!
//! Two caller classes, two mechanisms:
//!
//! - End users present a bearer JWT issued by the identity provider,
//!   verified as ES256 against the configured public key ([`jwt`]).
//! - The backend orchestrator presents an HMAC-SHA256 signature computed
//!   with a shared secret, compared in constant time ([`hmac`]).
//!
//! Handlers pick the mechanism by route; nothing here touches the network.

pub mod hmac;
pub mod jwt;

pub use hmac::verify_axal_signature;
pub use jwt::validate_jwt_and_extract_principal;
