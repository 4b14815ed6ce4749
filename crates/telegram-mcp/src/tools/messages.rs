//! `messages_*` tools.

use base64::Engine;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{count, parse_args, ChatIdArg};
use crate::error::{ToolError, ToolResult};
use crate::format::{
    format_media, format_message, format_messages, format_recent_dialog, MessageRecord,
    RecentDialogRecord,
};
use crate::telegram::TelegramClient;

const DEFAULT_HISTORY_LIMIT: usize = 100;
const MAX_HISTORY_LIMIT: usize = 100;
const DEFAULT_SEARCH_LIMIT: usize = 50;
const MAX_SEARCH_LIMIT: usize = 100;
const DEFAULT_RECENT_CHATS: usize = 10;
const MAX_RECENT_CHATS: usize = 50;
const DEFAULT_PER_CHAT: usize = 10;
const MAX_PER_CHAT: usize = 100;

pub async fn handle(client: &dyn TelegramClient, name: &str, args: Value) -> ToolResult<Value> {
    match name {
        "messages_sendText" => send_text(client, parse_args(args)?).await,
        "messages_getHistory" => get_history(client, parse_args(args)?).await,
        "messages_search" => search(client, parse_args(args)?).await,
        "messages_getRecent" => get_recent(client, parse_args(args)?).await,
        "messages_downloadMedia" => download_media(client, parse_args(args)?).await,
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageRecord>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl MessagesResponse {
    fn new(messages: Vec<MessageRecord>, query: Option<String>) -> Self {
        Self {
            count: messages.len(),
            messages,
            query,
        }
    }
}

// ============================================================================
// messages_sendText
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTextArgs {
    pub chat_id: ChatIdArg,
    pub text: String,
    pub reply_to_message_id: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SendTextResponse {
    pub success: bool,
    pub message: MessageRecord,
}

#[instrument(skip(client, args), fields(chat_id = ?args.chat_id))]
async fn send_text(client: &dyn TelegramClient, args: SendTextArgs) -> ToolResult<Value> {
    if args.text.is_empty() {
        return Err(ToolError::invalid("text", "must not be empty"));
    }
    let chat = args.chat_id.to_chat_ref()?;
    let reply_to = args
        .reply_to_message_id
        .map(|v| message_id("replyToMessageId", v))
        .transpose()?;

    let peer = client.resolve_chat(&chat).await?;
    let sent = client.send_text(&peer, &args.text, reply_to).await?;
    debug!(chat_id = peer.id, message_id = sent.id, "Message sent");

    Ok(serde_json::to_value(SendTextResponse {
        success: true,
        message: format_message(&sent),
    })?)
}

// ============================================================================
// messages_getHistory
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetHistoryArgs {
    pub chat_id: ChatIdArg,
    pub limit: Option<f64>,
    pub offset_id: Option<f64>,
}

#[instrument(skip(client))]
async fn get_history(client: &dyn TelegramClient, args: GetHistoryArgs) -> ToolResult<Value> {
    let chat = args.chat_id.to_chat_ref()?;
    let limit = count(args.limit, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT);
    let offset_id = args
        .offset_id
        .map(|v| message_id("offsetId", v))
        .transpose()?;

    let peer = client.resolve_chat(&chat).await?;
    let messages = client.get_history(&peer, limit, offset_id).await?;

    Ok(serde_json::to_value(MessagesResponse::new(
        format_messages(&messages),
        None,
    ))?)
}

// ============================================================================
// messages_search
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArgs {
    pub chat_id: Option<ChatIdArg>,
    pub query: String,
    pub limit: Option<f64>,
}

#[instrument(skip(client))]
async fn search(client: &dyn TelegramClient, args: SearchArgs) -> ToolResult<Value> {
    let limit = count(args.limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);

    let peer = match args.chat_id {
        Some(ref chat_id) => Some(client.resolve_chat(&chat_id.to_chat_ref()?).await?),
        None => None,
    };
    let messages = client.search(peer.as_ref(), &args.query, limit).await?;

    Ok(serde_json::to_value(MessagesResponse::new(
        format_messages(&messages),
        Some(args.query),
    ))?)
}

// ============================================================================
// messages_getRecent
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRecentArgs {
    pub limit: Option<f64>,
    pub messages_per_chat: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RecentChat {
    pub dialog: RecentDialogRecord,
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub chats: Vec<RecentChat>,
    pub count: usize,
}

#[instrument(skip(client))]
async fn get_recent(client: &dyn TelegramClient, args: GetRecentArgs) -> ToolResult<Value> {
    let chats = count(args.limit, DEFAULT_RECENT_CHATS, MAX_RECENT_CHATS);
    let per_chat = count(args.messages_per_chat, DEFAULT_PER_CHAT, MAX_PER_CHAT);

    let dialogs = client.list_dialogs(chats).await?;
    let histories = try_join_all(
        dialogs
            .iter()
            .map(|d| client.get_history(&d.peer, per_chat, None)),
    )
    .await?;

    let chats: Vec<RecentChat> = dialogs
        .iter()
        .zip(histories)
        .map(|(dialog, messages)| RecentChat {
            dialog: format_recent_dialog(dialog),
            messages: format_messages(&messages),
        })
        .collect();

    Ok(serde_json::to_value(RecentResponse {
        count: chats.len(),
        chats,
    })?)
}

// ============================================================================
// messages_downloadMedia
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadMediaArgs {
    pub chat_id: ChatIdArg,
    pub message_id: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadMediaResponse {
    pub message_id: i32,
    pub media: Value,
    pub mime_type: Option<String>,
    pub size: usize,
    /// Base64 (standard alphabet, padded)
    pub data: String,
}

#[instrument(skip(client))]
async fn download_media(client: &dyn TelegramClient, args: DownloadMediaArgs) -> ToolResult<Value> {
    let chat = args.chat_id.to_chat_ref()?;
    let id = message_id("messageId", args.message_id)?;

    let peer = client.resolve_chat(&chat).await?;
    let message = client
        .get_message(&peer, id)
        .await?
        .ok_or_else(|| ToolError::NotFound(format!("Message {} not found", id)))?;

    if !message.media.as_ref().is_some_and(|m| m.is_downloadable()) {
        return Err(ToolError::NoMedia(id));
    }

    let downloaded = client
        .download_media(&peer, id)
        .await?
        .ok_or(ToolError::NoMedia(id))?;
    debug!(message_id = id, bytes = downloaded.bytes.len(), "Media downloaded");

    Ok(serde_json::to_value(DownloadMediaResponse {
        message_id: id,
        media: format_media(&downloaded.media),
        mime_type: downloaded.media.mime_type().map(String::from),
        size: downloaded.bytes.len(),
        data: base64::engine::general_purpose::STANDARD.encode(&downloaded.bytes),
    })?)
}

fn message_id(field: &str, raw: f64) -> ToolResult<i32> {
    if raw.is_finite() && raw.fract() == 0.0 && raw >= 1.0 && raw <= i32::MAX as f64 {
        Ok(raw as i32)
    } else {
        Err(ToolError::invalid(field, format!("{} is not a message id", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_validation() {
        assert_eq!(message_id("messageId", 42.0).unwrap(), 42);
        assert!(message_id("messageId", 0.0).is_err());
        assert!(message_id("messageId", 1.5).is_err());
        assert!(message_id("offsetId", f64::NAN).is_err());
    }
}
