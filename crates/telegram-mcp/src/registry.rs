//! Tool registry - list of all available tools
//!
//! Schemas are declarative metadata for MCP discovery. The router only reads
//! the `required` list from them.

use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};

/// Name, description and input schema of one tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

impl ToolInfo {
    /// Fields the schema marks as required.
    pub fn required_fields(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(|v| v.as_array())
            .map(|fields| fields.iter().filter_map(|f| f.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn to_mcp_tool(&self) -> rmcp::model::Tool {
        let schema = match &self.input_schema {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        rmcp::model::Tool::new(self.name, self.description, Arc::new(schema))
    }
}

/// The static tool catalogue.
pub fn tools() -> &'static [ToolInfo] {
    static TOOLS: OnceLock<Vec<ToolInfo>> = OnceLock::new();
    TOOLS.get_or_init(build_tools)
}

pub fn find(name: &str) -> Option<&'static ToolInfo> {
    tools().iter().find(|t| t.name == name)
}

fn build_tools() -> Vec<ToolInfo> {
    vec![
        // ==========================================================================
        // Message Tools
        // ==========================================================================
        ToolInfo {
            name: "messages_sendText",
            description: "Send a text message to a chat",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "chatId": { "type": "string", "description": "Chat/User ID or username" },
                    "text": { "type": "string", "description": "Message text to send" },
                    "replyToMessageId": { "type": "number", "description": "Message ID to reply to" }
                },
                "required": ["chatId", "text"]
            }),
        },
        ToolInfo {
            name: "messages_getHistory",
            description: "Get message history from a chat",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "chatId": { "type": "string", "description": "Chat/User ID or username" },
                    "limit": { "type": "number", "description": "Number of messages to retrieve (default: 100, max: 100)" },
                    "offsetId": { "type": "number", "description": "Message ID to start from (returns older messages)" }
                },
                "required": ["chatId"]
            }),
        },
        ToolInfo {
            name: "messages_search",
            description: "Search messages in one chat, or across all chats when chatId is omitted",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "chatId": { "type": "string", "description": "Chat/User ID or username (optional)" },
                    "query": { "type": "string", "description": "Search query" },
                    "limit": { "type": "number", "description": "Maximum number of results (default: 50, max: 100)" }
                },
                "required": ["query"]
            }),
        },
        ToolInfo {
            name: "messages_getRecent",
            description: "Get recent messages from the most recently active chats",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "number", "description": "Number of chats to include (default: 10)" },
                    "messagesPerChat": { "type": "number", "description": "Messages per chat (default: 10)" }
                }
            }),
        },
        ToolInfo {
            name: "messages_downloadMedia",
            description: "Download the media attached to a message as base64",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "chatId": { "type": "string", "description": "Chat/User ID or username" },
                    "messageId": { "type": "number", "description": "ID of the message carrying the media" }
                },
                "required": ["chatId", "messageId"]
            }),
        },

        // ==========================================================================
        // Dialog Tools
        // ==========================================================================
        ToolInfo {
            name: "dialogs_list",
            description: "List dialogs (chats, groups, channels)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "number", "description": "Maximum number of dialogs to return (default: 50)" },
                    "filter": {
                        "type": "object",
                        "description": "Restrict the result to one kind of dialog",
                        "properties": {
                            "onlyUsers": { "type": "boolean" },
                            "onlyGroups": { "type": "boolean" },
                            "onlyChannels": { "type": "boolean" }
                        }
                    }
                }
            }),
        },
        ToolInfo {
            name: "dialogs_getInfo",
            description: "Get detailed information about a dialog",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "chatId": { "type": "string", "description": "Chat/User ID or username" }
                },
                "required": ["chatId"]
            }),
        },

        // ==========================================================================
        // Wait Tools
        // ==========================================================================
        ToolInfo {
            name: "wait_for_reply",
            description: "Wait for the next message in a chat",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "chatId": { "type": "string", "description": "Chat/User ID or username to wait for a message from" },
                    "timeoutSeconds": { "type": "number", "description": "Timeout in seconds (default: 60, max: 300)" }
                },
                "required": ["chatId"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tool_names_unique() {
        let names: HashSet<_> = tools().iter().map(|t| t.name).collect();
        assert_eq!(names.len(), tools().len());
    }

    #[test]
    fn test_all_tools_have_known_prefix() {
        for tool in tools() {
            assert!(
                ["dialogs_", "messages_", "wait_"]
                    .iter()
                    .any(|p| tool.name.starts_with(p)),
                "{} has no routable prefix",
                tool.name
            );
        }
    }

    #[test]
    fn test_required_fields() {
        let send = find("messages_sendText").unwrap();
        assert_eq!(send.required_fields(), vec!["chatId", "text"]);
        assert!(find("dialogs_list").unwrap().required_fields().is_empty());
        assert!(find("foo_bar").is_none());
    }

    #[test]
    fn test_to_mcp_tool() {
        let tool = find("wait_for_reply").unwrap().to_mcp_tool();
        assert_eq!(tool.name, "wait_for_reply");
        assert_eq!(tool.input_schema.get("type").and_then(|v| v.as_str()), Some("object"));
    }
}
