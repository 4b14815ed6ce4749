//! Error types for tool calls and the client seam.

use thiserror::Error;

/// Failures surfaced by a [`crate::telegram::TelegramClient`] implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Telegram request failed: {0}")]
    Invocation(String),

    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Session error: {0}")]
    Session(#[from] std::io::Error),

    #[error("Client is disconnected")]
    Disconnected,

    #[error("Session is not authorized; run `telegram-mcp login` first")]
    NotAuthorized,
}

/// Everything a tool call can fail with. All of these become an `isError`
/// reply, never a protocol-level error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Already waiting for a message from chat {0}")]
    AlreadyWaiting(String),

    #[error("Timeout waiting for message after {0} seconds")]
    Timeout(u64),

    #[error("Telegram client is not ready")]
    ClientNotReady,

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Message {0} has no downloadable media")]
    NoMedia(i32),

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ToolError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_messages_match_wire_text() {
        assert_eq!(
            ToolError::AlreadyWaiting("123".to_string()).to_string(),
            "Already waiting for a message from chat 123"
        );
        assert_eq!(
            ToolError::Timeout(1).to_string(),
            "Timeout waiting for message after 1 seconds"
        );
    }

    #[test]
    fn test_client_error_passes_through() {
        let err: ToolError = ClientError::PeerNotFound("@ghost".to_string()).into();
        assert_eq!(err.to_string(), "Peer not found: @ghost");
    }
}
