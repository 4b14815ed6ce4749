//! MCP server over stdio.
//!
//! Startup connects the Telegram client, starts the incoming-message
//! listener and then serves MCP until stdin closes or a shutdown signal
//! arrives. Teardown runs in reverse: the listener stops, the client slot is
//! cleared and the session is saved.

use anyhow::{Context, Result};
use rmcp::service::{QuitReason, RoleServer};
use rmcp::transport::{stdio, IntoTransport};
use rmcp::ServiceExt;
use std::future::Future;
use std::sync::Arc;
use tgconf::TgConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::handler::{new_client_slot, TelegramHandler};
use crate::listener::spawn_listener;
use crate::reply_wait::{ReplyWaitCoordinator, WaitLimits};
use crate::telegram::mtproto::MtprotoClient;
use crate::telegram::TelegramClient;

/// Run the server on stdin/stdout with the real Telegram client.
pub async fn run(config: &TgConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    info!("📨 telegram-mcp starting");
    info!("   Session: {}", config.telegram.session_path.display());

    let client = MtprotoClient::connect(&config.telegram)
        .await
        .context("Failed to start Telegram client")?;

    serve_session(
        Arc::new(client),
        WaitLimits::from(&config.wait),
        stdio(),
        shutdown_signal(),
    )
    .await
}

/// Serve one MCP session over `transport` backed by `client`.
///
/// Returns once the peer closes the transport or `shutdown` resolves.
pub async fn serve_session<T, E, A, F>(
    client: Arc<dyn TelegramClient>,
    limits: WaitLimits,
    transport: T,
    shutdown: F,
) -> Result<()>
where
    T: IntoTransport<RoleServer, E, A>,
    E: std::error::Error + Send + Sync + 'static,
    F: Future<Output = ()>,
{
    let coordinator = Arc::new(ReplyWaitCoordinator::new(limits));
    let slot = new_client_slot();
    *slot.write().await = Some(Arc::clone(&client));

    let listener_cancel = CancellationToken::new();
    let listener = spawn_listener(
        Arc::clone(&client),
        Arc::clone(&coordinator),
        listener_cancel.clone(),
    );

    let handler = TelegramHandler::new(Arc::clone(&slot), coordinator);
    let service_cancel = CancellationToken::new();
    let service = handler
        .serve_with_ct(transport, service_cancel.clone())
        .await
        .context("Failed to start MCP service")?;

    info!("📨 telegram-mcp ready on stdio");

    let waiting = service.waiting();
    tokio::pin!(waiting);
    tokio::pin!(shutdown);

    let outcome = tokio::select! {
        res = &mut waiting => res,
        _ = &mut shutdown => {
            service_cancel.cancel();
            waiting.await
        }
    };
    match outcome {
        Ok(QuitReason::Closed) => info!("MCP transport closed"),
        Ok(QuitReason::Cancelled) => info!("MCP service cancelled"),
        Ok(reason) => warn!(?reason, "MCP service stopped"),
        Err(e) => warn!(error = %e, "MCP service task failed"),
    }

    listener_cancel.cancel();
    slot.write().await.take();
    if let Err(e) = client.disconnect().await {
        warn!(error = %e, "Failed to disconnect Telegram client cleanly");
    }
    if let Err(e) = listener.await {
        warn!(error = %e, "Listener task failed");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let terminate = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
