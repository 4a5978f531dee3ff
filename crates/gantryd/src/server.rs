//! TCP front end.
//!
//! `GatewayServer` accepts connections and spawns a tokio task per
//! connection that drives one application response to completion.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::connection::{ConnectionContext, serve_connection};

/// Gateway server.
///
/// Binds to a TCP address and hands every accepted connection to the
/// configured application.
pub struct GatewayServer {
    bind_addr: SocketAddr,
    ctx: ConnectionContext,
}

impl GatewayServer {
    pub fn new(bind_addr: SocketAddr, ctx: ConnectionContext) -> Self {
        Self { bind_addr, ctx }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Bind and serve until the shutdown signal is received.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("failed to bind {}", self.bind_addr))?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// In-flight connections are not waited for on shutdown.
    pub async fn serve_listener(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let addr = listener.local_addr().context("listener has no local address")?;
        info!(%addr, "gateway listening");

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, peer_addr) = accept_result.context("accept failed")?;
                    let ctx = self.ctx.clone();

                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, peer_addr, ctx).await {
                            error!(%peer_addr, error = %e, "connection error");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    info!("gateway shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
