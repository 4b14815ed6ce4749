//! Tool handler groups.

pub mod dialogs;
pub mod messages;
pub mod wait;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::dispatch::ToolHandlers;
use crate::error::{ToolError, ToolResult};
use crate::reply_wait::ReplyWaitCoordinator;
use crate::telegram::{ChatRef, TelegramClient};

/// Handlers backed by a live client and the server's wait coordinator.
pub struct TelegramTools {
    pub client: Arc<dyn TelegramClient>,
    pub coordinator: Arc<ReplyWaitCoordinator>,
}

impl TelegramTools {
    pub fn new(client: Arc<dyn TelegramClient>, coordinator: Arc<ReplyWaitCoordinator>) -> Self {
        Self {
            client,
            coordinator,
        }
    }
}

#[async_trait]
impl ToolHandlers for TelegramTools {
    async fn dialogs(&self, name: &str, args: Value) -> ToolResult<Value> {
        dialogs::handle(self.client.as_ref(), name, args).await
    }

    async fn messages(&self, name: &str, args: Value) -> ToolResult<Value> {
        messages::handle(self.client.as_ref(), name, args).await
    }

    async fn wait(&self, name: &str, args: Value) -> ToolResult<Value> {
        wait::handle(self.client.as_ref(), &self.coordinator, name, args).await
    }
}

/// `chatId` as sent by clients: usually a string, sometimes a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChatIdArg {
    Number(i64),
    Text(String),
}

impl ChatIdArg {
    pub fn to_chat_ref(&self) -> ToolResult<ChatRef> {
        let parsed = match self {
            ChatIdArg::Number(id) => ChatRef::parse(&id.to_string()),
            ChatIdArg::Text(raw) => ChatRef::parse(raw),
        };
        parsed.ok_or_else(|| ToolError::invalid("chatId", "must be a numeric id or a username"))
    }
}

/// Deserialize tool arguments into a typed struct.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> ToolResult<T> {
    serde_json::from_value(args).map_err(|e| ToolError::invalid("arguments", e.to_string()))
}

/// Coerce a JSON number (clients often send floats) to a non-negative count.
pub(crate) fn count(value: Option<f64>, default: usize, max: usize) -> usize {
    match value {
        Some(v) if v.is_finite() && v >= 1.0 => (v as usize).min(max),
        _ => default.min(max),
    }
}
