//! Reply-wait coordination.
//!
//! A tool call registers interest in the next incoming message for a chat and
//! awaits a oneshot; the message listener delivers into it. The map entry is
//! the commit point: whoever removes it (delivery or expiry) decides the
//! outcome, and removal plus send happen under the same lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tgconf::MAX_WAIT_TIMEOUT_SECS;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::telegram::Message;

/// Default and upper bound for wait timeouts.
#[derive(Debug, Clone, Copy)]
pub struct WaitLimits {
    pub default: Duration,
    pub max: Duration,
}

impl Default for WaitLimits {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(60),
            max: Duration::from_secs(MAX_WAIT_TIMEOUT_SECS),
        }
    }
}

impl From<&tgconf::WaitConfig> for WaitLimits {
    fn from(config: &tgconf::WaitConfig) -> Self {
        let max = config.max_timeout_secs.clamp(1, MAX_WAIT_TIMEOUT_SECS);
        Self {
            default: Duration::from_secs(config.default_timeout_secs.clamp(1, max)),
            max: Duration::from_secs(max),
        }
    }
}

impl WaitLimits {
    /// Resolve a requested timeout in seconds: default when absent, at least
    /// one second, never above `max`.
    pub fn clamp(&self, requested_secs: Option<u64>) -> Duration {
        let requested = requested_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default);
        requested.clamp(Duration::from_secs(1), self.max)
    }
}

struct PendingWait {
    id: u64,
    tx: oneshot::Sender<Message>,
}

/// Pending waits keyed by chat. One per server instance.
pub struct ReplyWaitCoordinator {
    pending: Mutex<HashMap<String, PendingWait>>,
    next_id: AtomicU64,
    limits: WaitLimits,
}

impl ReplyWaitCoordinator {
    pub fn new(limits: WaitLimits) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            limits,
        }
    }

    pub fn limits(&self) -> WaitLimits {
        self.limits
    }

    /// Wait for the next incoming message on `chat_key`.
    ///
    /// Fails with `AlreadyWaiting` if a wait for the key is outstanding (the
    /// existing wait is left alone), or `Timeout` once `timeout` elapses.
    /// Dropping the returned future withdraws the registration.
    pub async fn wait(&self, chat_key: &str, timeout: Duration) -> Result<Message, ToolError> {
        let (id, mut rx) = self.register(chat_key)?;
        let registration = Registration {
            coordinator: self,
            chat_key,
            id,
        };

        debug!(chat_key, timeout_secs = timeout.as_secs(), "Waiting for reply");

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => {
                // Sender vanished without delivering; only happens if the
                // entry was dropped out from under us.
                Err(ToolError::Timeout(timeout.as_secs()))
            }
            Err(_) => registration.expire(&mut rx, timeout),
        }
    }

    /// Offer an incoming message to whoever waits on its chat.
    ///
    /// Outgoing messages are ignored. Returns true if a wait was fulfilled.
    pub fn deliver(&self, message: Message) -> bool {
        if message.outgoing {
            return false;
        }

        let chat_key = message.chat.chat_key();
        let mut pending = self.lock();
        let Some(wait) = pending.remove(&chat_key) else {
            return false;
        };

        if wait.tx.send(message).is_err() {
            // Receiver already gone (caller dropped); nothing to fulfil.
            warn!(chat_key = %chat_key, "Reply wait receiver dropped before delivery");
            return false;
        }
        debug!(chat_key = %chat_key, "Reply wait fulfilled");
        true
    }

    pub fn is_waiting(&self, chat_key: &str) -> bool {
        self.lock().contains_key(chat_key)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn register(&self, chat_key: &str) -> Result<(u64, oneshot::Receiver<Message>), ToolError> {
        let mut pending = self.lock();
        if pending.contains_key(chat_key) {
            return Err(ToolError::AlreadyWaiting(chat_key.to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        pending.insert(chat_key.to_string(), PendingWait { id, tx });
        Ok((id, rx))
    }

    /// Remove the entry for `chat_key` if it still belongs to wait `id`.
    fn withdraw(&self, chat_key: &str, id: u64) -> bool {
        let mut pending = self.lock();
        match pending.get(chat_key) {
            Some(wait) if wait.id == id => {
                pending.remove(chat_key);
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingWait>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ReplyWaitCoordinator {
    fn default() -> Self {
        Self::new(WaitLimits::default())
    }
}

/// Ties a map entry to the lifetime of the waiting future.
struct Registration<'a> {
    coordinator: &'a ReplyWaitCoordinator,
    chat_key: &'a str,
    id: u64,
}

impl Registration<'_> {
    /// The timer fired. Whoever removes the entry decides: if it is still
    /// ours this is a timeout, otherwise delivery got there first and the
    /// message is already in `rx`.
    fn expire(
        &self,
        rx: &mut oneshot::Receiver<Message>,
        timeout: Duration,
    ) -> Result<Message, ToolError> {
        if self.coordinator.withdraw(self.chat_key, self.id) {
            debug!(chat_key = self.chat_key, "Reply wait timed out");
            return Err(ToolError::Timeout(timeout.as_secs()));
        }
        rx.try_recv()
            .map_err(|_| ToolError::Timeout(timeout.as_secs()))
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.coordinator.withdraw(self.chat_key, self.id);
    }
}
