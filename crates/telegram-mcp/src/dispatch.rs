//! Tool call routing.
//!
//! Checks the name against the registry and the arguments against the
//! schema's `required` list, then hands the call to one handler group chosen
//! by name prefix.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{ToolError, ToolResult};
use crate::registry;

/// Handler groups, one per tool name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolGroup {
    Dialogs,
    Messages,
    Wait,
}

impl ToolGroup {
    pub fn for_name(name: &str) -> Option<Self> {
        if name.starts_with("dialogs_") {
            Some(ToolGroup::Dialogs)
        } else if name.starts_with("messages_") {
            Some(ToolGroup::Messages)
        } else if name.starts_with("wait_") {
            Some(ToolGroup::Wait)
        } else {
            None
        }
    }
}

/// The three handler groups a call can be routed to.
#[async_trait]
pub trait ToolHandlers: Send + Sync {
    async fn dialogs(&self, name: &str, args: Value) -> ToolResult<Value>;
    async fn messages(&self, name: &str, args: Value) -> ToolResult<Value>;
    async fn wait(&self, name: &str, args: Value) -> ToolResult<Value>;
}

/// Validate and route a tool call.
pub async fn dispatch<H: ToolHandlers + ?Sized>(
    handlers: &H,
    name: &str,
    args: Value,
) -> ToolResult<Value> {
    let tool = registry::find(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
    let group = ToolGroup::for_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

    let args = match args {
        Value::Null => Value::Object(Default::default()),
        Value::Object(_) => args,
        other => {
            return Err(ToolError::invalid(
                "arguments",
                format!("expected an object, got {}", other),
            ))
        }
    };

    for field in tool.required_fields() {
        if args.get(field).map_or(true, Value::is_null) {
            return Err(ToolError::MissingArgument(field.to_string()));
        }
    }

    debug!(tool = %name, group = ?group, "Dispatching tool call");

    match group {
        ToolGroup::Dialogs => handlers.dialogs(name, args).await,
        ToolGroup::Messages => handlers.messages(name, args).await,
        ToolGroup::Wait => handlers.wait(name, args).await,
    }
}

/// Text for an `isError` reply, prefixed with what the tool was doing.
pub fn error_text(name: &str, err: &ToolError) -> String {
    if matches!(err, ToolError::UnknownTool(_)) {
        return err.to_string();
    }
    match action_for(name) {
        Some(action) => format!("Error {}: {}", action, err),
        None => format!("Error: {}", err),
    }
}

fn action_for(name: &str) -> Option<&'static str> {
    match name {
        "dialogs_list" => Some("listing dialogs"),
        "dialogs_getInfo" => Some("getting dialog info"),
        "messages_sendText" => Some("sending message"),
        "messages_getHistory" => Some("getting message history"),
        "messages_search" => Some("searching messages"),
        "messages_getRecent" => Some("getting recent messages"),
        "messages_downloadMedia" => Some("downloading media"),
        _ => None,
    }
}
