// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Application State
//!
//! Shared state passed to all Axum request handlers via the `State`
//! extractor. Everything inside is immutable after bootstrap (the user
//! cache synchronizes internally), so the whole struct is a cheap
//! `Clone` of `Arc`s and safe to share across request tasks.

use std::sync::Arc;

use crate::config::TeeConfig;
use crate::privy::PrivyClient;
use crate::whitelist::AddressWhitelist;

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide configuration, loaded once at startup.
    pub config: Arc<TeeConfig>,
    /// The custody-provider client (auth boundary, resolver, signing).
    pub privy: Arc<PrivyClient>,
    /// Permitted destination addresses.
    pub whitelist: Arc<AddressWhitelist>,
}

impl AppState {
    pub fn new(
        config: Arc<TeeConfig>,
        privy: Arc<PrivyClient>,
        whitelist: Arc<AddressWhitelist>,
    ) -> Self {
        Self {
            config,
            privy,
            whitelist,
        }
    }
}
