//! Incoming message listener.
//!
//! Pulls new messages from the client and offers each one to the reply-wait
//! coordinator until cancelled or the client disconnects.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::reply_wait::ReplyWaitCoordinator;
use crate::telegram::TelegramClient;

/// Pause after a failed update fetch before trying again.
const ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Consume incoming messages until `cancel` fires or the stream ends.
pub async fn run_listener(
    client: Arc<dyn TelegramClient>,
    coordinator: Arc<ReplyWaitCoordinator>,
    cancel: CancellationToken,
) {
    info!("Message listener started");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Message listener cancelled");
                break;
            }
            next = client.next_message() => next,
        };

        match next {
            Ok(Some(message)) => {
                if message.outgoing {
                    continue;
                }
                debug!(
                    chat_id = message.chat.id,
                    message_id = message.id,
                    "Incoming message"
                );
                coordinator.deliver(message);
            }
            Ok(None) => {
                warn!("Update stream ended");
                break;
            }
            Err(e) => {
                error!("Failed to receive update: {}", e);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }
    }

    info!("Message listener stopped");
}

/// Spawn [`run_listener`] on the runtime.
pub fn spawn_listener(
    client: Arc<dyn TelegramClient>,
    coordinator: Arc<ReplyWaitCoordinator>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_listener(client, coordinator, cancel))
}
