//! HTTP server startup with graceful shutdown.

mod lifecycle;
mod shutdown;

use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::TRACING_TARGET_SERVER_STARTUP;
use crate::config::ServerConfig;
use crate::server::lifecycle::serve_with_shutdown;
use crate::server::shutdown::{drain_deadline, shutdown_signal};

/// Binds the configured address and serves `app` until a shutdown signal.
///
/// After the signal, in-flight requests get up to the configured shutdown
/// timeout to finish before the server stops waiting for them.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(app: Router, config: &ServerConfig) -> io::Result<()> {
    let server_addr = config.server_addr();

    let listener = TcpListener::bind(server_addr).await.inspect_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %server_addr,
            error = %err,
            "Failed to bind to address"
        );
    })?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %server_addr,
        "Server is ready and listening for connections"
    );

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let signal = async move {
        shutdown_signal().await;
        let _ = signalled_tx.send(());
    };

    let shutdown_timeout = config.shutdown_timeout();
    serve_with_shutdown(config, || async move {
        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .into_future();

        tokio::select! {
            result = server => result,
            () = drain_deadline(signalled_rx, shutdown_timeout) => Ok(()),
        }
    })
    .await
}
