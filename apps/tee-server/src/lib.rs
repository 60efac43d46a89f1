// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TEE Verified Signer - Remote Transaction-Signing Service
//!
//! This crate provides a transaction-signing service that runs inside an
//! AWS Nitro enclave and mediates access to custodial wallets held by an
//! external custody provider. All outbound traffic leaves through
//! host-proxied vsock channels, with TLS terminated inside the enclave.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers served over the vsock ingress (Axum)
//! - `auth` - Request authentication (ES256 JWT, constant-time HMAC)
//! - `aws` - Credential sourcing, SigV4, Secrets Manager client
//! - `attestation` - NSM attestation documents and local verification
//! - `privy` - Custody-provider client, user resolver, batch signing
//! - `signing` - Canonical-JSON authorization envelopes (ECDSA P-256)
//! - `transport` - Vsock dialer and plain/TLS HTTP round-trippers
//! - `whitelist` - Destination-address whitelist

pub mod api;
pub mod attestation;
pub mod auth;
pub mod aws;
pub mod config;
pub mod error;
pub mod privy;
pub mod signing;
pub mod state;
pub mod transport;
pub mod whitelist;
