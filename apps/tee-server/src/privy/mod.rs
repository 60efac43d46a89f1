// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Custody-provider integration
//!
//! Everything that talks to (or models) the upstream custody provider:
//!
//! - `client`: the shared HTTP client, auth boundary, user resolution
//!   with lazy wallet provisioning, and the signing dispatch path
//! - `data`: wire types and the request sum type with total validation
//! - `user_cache`: bounded TTL memoization of resolved users
//! - `batch`: orchestrator batch execution
//! - `axal_signer`: operator-local claiming-key signing

pub mod axal_signer;
pub mod batch;
pub mod client;
pub mod data;
pub mod user_cache;

pub use client::PrivyClient;
