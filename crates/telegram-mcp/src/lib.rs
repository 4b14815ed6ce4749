//! telegram-mcp - a Telegram user account exposed as MCP tools
//!
//! This library provides:
//! - `telegram`: domain records, the client seam and the MTProto client
//! - `registry`: tool names, descriptions and input schemas
//! - `dispatch`: routing a tool call to its handler group
//! - `tools`: the dialogs, messages and wait handlers
//! - `reply_wait`: pending `wait_for_reply` registrations
//! - `listener`: feeds incoming messages to the reply waits
//! - `handler`: MCP handler implementation
//! - `serve`: stdio server lifecycle
//! - `login`: interactive sign-in

pub mod dispatch;
pub mod error;
pub mod format;
pub mod handler;
pub mod listener;
pub mod login;
pub mod registry;
pub mod reply_wait;
pub mod serve;
pub mod telegram;
pub mod telemetry;
pub mod tools;
