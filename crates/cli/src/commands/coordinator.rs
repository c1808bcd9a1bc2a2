// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! `lattice coordinator`: serve the gRPC broker.

use crate::context::{shutdown_signal, Context};
use lx_core::{HostInfo, ServiceName};
use lx_store::ServiceRegistry;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(clap::Args)]
pub struct CoordinatorArgs {
    /// Bind address; overrides the configuration file.
    #[arg(long, value_name = "HOST:PORT")]
    pub listen: Option<String>,
}

pub async fn run(ctx: &Context, args: CoordinatorArgs) -> anyhow::Result<ExitCode> {
    let listen = args.listen.unwrap_or_else(|| ctx.config.coordinator.listen.clone());
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen address {listen:?}: {e}"))?;

    let registry = ctx.registry();
    registry.register(ServiceName::Coordinator, HostInfo::active(&listen, chrono::Utc::now()));

    let coordinator = Arc::new(lx_coord::Coordinator::new());
    let cancel = shutdown_signal().await;
    let heartbeat = {
        let registry = Arc::clone(&registry);
        let listen = listen.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(std::time::Duration::from_secs(5));
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tick.tick() => registry.heartbeat(ServiceName::Coordinator, &listen),
                }
            }
        })
    };

    let shutdown = cancel.clone();
    lx_coord::serve(addr, coordinator, async move { shutdown.cancelled().await }).await?;

    heartbeat.abort();
    registry.unregister(ServiceName::Coordinator, &listen);
    info!("coordinator shut down");
    Ok(ExitCode::SUCCESS)
}
