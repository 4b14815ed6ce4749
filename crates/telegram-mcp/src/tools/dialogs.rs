//! `dialogs_*` tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::{count, parse_args, ChatIdArg};
use crate::error::{ToolError, ToolResult};
use crate::format::{
    format_dialog, format_full_info, format_peer, DialogRecord, FullInfoRecord, PeerRecord,
};
use crate::telegram::{ChatRef, Dialog, PeerKind, TelegramClient};

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

pub async fn handle(client: &dyn TelegramClient, name: &str, args: Value) -> ToolResult<Value> {
    match name {
        "dialogs_list" => list(client, parse_args(args)?).await,
        "dialogs_getInfo" => get_info(client, parse_args(args)?).await,
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

// ============================================================================
// dialogs_list
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogFilter {
    #[serde(default)]
    pub only_users: bool,
    #[serde(default)]
    pub only_groups: bool,
    #[serde(default)]
    pub only_channels: bool,
}

impl DialogFilter {
    fn is_empty(&self) -> bool {
        !(self.only_users || self.only_groups || self.only_channels)
    }

    /// With several flags set, a dialog passes if it matches any of them.
    fn accepts(&self, dialog: &Dialog) -> bool {
        if self.is_empty() {
            return true;
        }
        match dialog.peer.kind {
            PeerKind::User => self.only_users,
            PeerKind::Group | PeerKind::Supergroup => self.only_groups,
            PeerKind::Channel => self.only_channels,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListArgs {
    pub limit: Option<f64>,
    #[serde(default)]
    pub filter: Option<DialogFilter>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub dialogs: Vec<DialogRecord>,
    pub count: usize,
}

#[instrument(skip(client), fields(limit = ?args.limit))]
async fn list(client: &dyn TelegramClient, args: ListArgs) -> ToolResult<Value> {
    let limit = count(args.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let filter = args.filter.unwrap_or_default();

    let found = if filter.is_empty() {
        client.list_dialogs(limit).await?
    } else {
        client.scan_dialogs(&|d: &Dialog| filter.accepts(d), limit).await?
    };
    let dialogs: Vec<DialogRecord> = found.iter().map(format_dialog).collect();

    let response = ListResponse {
        count: dialogs.len(),
        dialogs,
    };
    Ok(serde_json::to_value(response)?)
}

// ============================================================================
// dialogs_getInfo
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInfoArgs {
    pub chat_id: ChatIdArg,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInfoResponse {
    pub peer: PeerRecord,
    pub dialog: DialogRecord,
    pub full_info: FullInfoRecord,
}

#[instrument(skip(client))]
async fn get_info(client: &dyn TelegramClient, args: GetInfoArgs) -> ToolResult<Value> {
    let chat = args.chat_id.to_chat_ref()?;

    let dialog = find_dialog(client, &chat)
        .await?
        .ok_or_else(|| ToolError::NotFound("Dialog not found".to_string()))?;

    let full_info = client.full_info(&dialog.peer).await?;

    let response = GetInfoResponse {
        peer: format_peer(&dialog.peer),
        dialog: format_dialog(&dialog),
        full_info: format_full_info(&full_info),
    };
    Ok(serde_json::to_value(response)?)
}

/// The dialog `chat` names, stopping at the first hit. A positive id that
/// matches no user falls back to a group or channel with that bare id.
async fn find_dialog(client: &dyn TelegramClient, chat: &ChatRef) -> ToolResult<Option<Dialog>> {
    let exact = client.scan_dialogs(&|d: &Dialog| d.peer.matches(chat), 1).await?;
    if let Some(dialog) = exact.into_iter().next() {
        return Ok(Some(dialog));
    }
    if !matches!(chat, ChatRef::Id(id) if *id > 0) {
        return Ok(None);
    }
    let bare = client
        .scan_dialogs(&|d: &Dialog| d.peer.matches_bare_id(chat), 1)
        .await?;
    Ok(bare.into_iter().next())
}
