// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Health endpoint.

use axum::Json;

use crate::privy::data::Message;

/// Liveness ping. Always answers if the process is serving.
pub async fn ping() -> Json<Message> {
    Json(Message::new("pong from tee"))
}
