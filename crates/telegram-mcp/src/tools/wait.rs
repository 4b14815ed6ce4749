//! `wait_for_reply`.
//!
//! The chat argument is resolved to its peer before registering, so a
//! username and a numeric id for the same chat share one pending entry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, instrument};

use super::{parse_args, ChatIdArg};
use crate::error::{ToolError, ToolResult};
use crate::format::{format_message, MessageRecord};
use crate::reply_wait::ReplyWaitCoordinator;
use crate::telegram::TelegramClient;

pub async fn handle(
    client: &dyn TelegramClient,
    coordinator: &ReplyWaitCoordinator,
    name: &str,
    args: Value,
) -> ToolResult<Value> {
    match name {
        "wait_for_reply" => wait_for_reply(client, coordinator, parse_args(args)?).await,
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitArgs {
    pub chat_id: ChatIdArg,
    pub timeout_seconds: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitResponse {
    pub success: bool,
    pub message: MessageRecord,
    pub wait_time_ms: u64,
    pub wait_time_seconds: u64,
}

#[instrument(skip(client, coordinator))]
async fn wait_for_reply(
    client: &dyn TelegramClient,
    coordinator: &ReplyWaitCoordinator,
    args: WaitArgs,
) -> ToolResult<Value> {
    let chat = args.chat_id.to_chat_ref()?;
    let requested = args
        .timeout_seconds
        .filter(|s| s.is_finite())
        .map(|s| s.max(0.0).ceil() as u64);
    let timeout = coordinator.limits().clamp(requested);

    let peer = client.resolve_chat(&chat).await?;
    let chat_key = peer.chat_key();

    let started = Instant::now();
    let message = coordinator.wait(&chat_key, timeout).await?;
    let waited = started.elapsed();

    info!(
        chat_id = peer.id,
        wait_ms = waited.as_millis() as u64,
        "Reply received"
    );

    Ok(serde_json::to_value(WaitResponse {
        success: true,
        message: format_message(&message),
        wait_time_ms: waited.as_millis() as u64,
        wait_time_seconds: (waited.as_millis() as f64 / 1000.0).round() as u64,
    })?)
}
