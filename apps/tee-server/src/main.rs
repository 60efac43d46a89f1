// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio_vsock::{VsockAddr, VsockListener, VMADDR_CID_ANY};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tee_server::api::router;
use tee_server::config::TeeConfig;
use tee_server::privy::PrivyClient;
use tee_server::state::AppState;
use tee_server::whitelist::AddressWhitelist;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    if let Err(err) = run().await {
        error!(error = %err, "fatal bootstrap failure");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".into());

    let mut config = TeeConfig::load(&config_path)?;
    config.bootstrap_secrets().await?;
    let config = Arc::new(config);

    let whitelist = Arc::new(AddressWhitelist::from_config(&config.whitelist)?);
    let privy = Arc::new(PrivyClient::new(config.clone(), whitelist.clone())?);
    let state = AppState::new(config.clone(), privy, whitelist);
    let app = router(state);

    let port = config.ports.router_vsock_port;
    let mut listener = VsockListener::bind(VsockAddr::new(VMADDR_CID_ANY, port))?;
    info!(port, "TEE server listening on vsock");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "vsock accept failed");
                continue;
            }
        };

        let service = TowerToHyperService::new(app.clone());
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            if let Err(err) = hyper::server::conn::http1::Builder::new()
                .serve_connection(io, service)
                .await
            {
                warn!(error = %err, peer = ?peer, "connection ended with error");
            }
        });
    }
}
