//! MCP handler.
//!
//! Lists the registry and turns every tool outcome into a `CallToolResult`.
//! Tool failures are reported with `isError` set; they never become
//! JSON-RPC errors.

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::dispatch::{dispatch, error_text};
use crate::error::ToolError;
use crate::registry;
use crate::reply_wait::ReplyWaitCoordinator;
use crate::telegram::TelegramClient;
use crate::tools::TelegramTools;

/// The connected client, or `None` before startup finishes and after shutdown.
pub type ClientSlot = Arc<RwLock<Option<Arc<dyn TelegramClient>>>>;

pub fn new_client_slot() -> ClientSlot {
    Arc::new(RwLock::new(None))
}

/// MCP server handler exposing the Telegram tools.
#[derive(Clone)]
pub struct TelegramHandler {
    client: ClientSlot,
    coordinator: Arc<ReplyWaitCoordinator>,
}

impl TelegramHandler {
    pub fn new(client: ClientSlot, coordinator: Arc<ReplyWaitCoordinator>) -> Self {
        Self {
            client,
            coordinator,
        }
    }

    /// Run one tool call to completion.
    pub async fn call(&self, name: &str, args: Value) -> CallToolResult {
        info!(tool = %name, "Tool call");

        let client = self.client.read().await.clone();
        let outcome = match client {
            Some(client) => {
                let tools = TelegramTools::new(client, Arc::clone(&self.coordinator));
                dispatch(&tools, name, args).await
            }
            None if registry::find(name).is_none() => Err(ToolError::UnknownTool(name.to_string())),
            None => Err(ToolError::ClientNotReady),
        };

        match outcome {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                CallToolResult::success(vec![Content::text(text)])
            }
            Err(err) => {
                warn!(tool = %name, error = %err, "Tool call failed");
                CallToolResult::error(vec![Content::text(error_text(name, &err))])
            }
        }
    }
}

impl ServerHandler for TelegramHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "telegram-mcp".to_string(),
                title: Some("Telegram".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for a Telegram user account.\n\n\
                 - dialogs_list / dialogs_getInfo: browse chats\n\
                 - messages_*: send, read, search and download media\n\
                 - wait_for_reply: block until the next incoming message in a chat\n\n\
                 chatId accepts a numeric id or a username (with or without @)."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = registry::tools().iter().map(|t| t.to_mcp_tool()).collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        Ok(self.call(&request.name, args).await)
    }
}
