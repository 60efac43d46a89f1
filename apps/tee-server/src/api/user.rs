// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoint.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use super::auth_header;
use crate::error::ApiError;
use crate::privy::data::PrivyUser;
use crate::state::AppState;

/// GET /api/v1/user. JWT auth. Resolves the caller's record, lazily
/// provisioning a delegated ethereum wallet on first use.
pub async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PrivyUser>, ApiError> {
    let auth = auth_header(&headers)?;
    let user = state.privy.get_user(&auth).await?;
    Ok(Json(user))
}
