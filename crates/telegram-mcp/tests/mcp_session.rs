//! MCP protocol over an in-process duplex pipe.
//!
//! Drives `serve_session` the way a stdio client would: one JSON-RPC message
//! per line.

mod common;

use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use common::{sample_dialogs, MockClient};
use telegram_mcp::reply_wait::WaitLimits;
use telegram_mcp::serve::serve_session;

struct Peer<R, W> {
    reader: tokio::io::Lines<BufReader<R>>,
    writer: W,
}

impl<R, W> Peer<R, W>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    async fn send(&mut self, message: Value) {
        let mut line = message.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(5), self.reader.next_line())
            .await
            .expect("response within 5s")
            .unwrap()
            .expect("server closed the pipe");
        serde_json::from_str(&line).expect("response is JSON")
    }

    async fn initialize(&mut self) -> Value {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "1.0" }
            }
        }))
        .await;
        let response = self.recv().await;
        self.send(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .await;
        response
    }
}

#[tokio::test]
async fn test_session_lists_and_calls_tools() {
    let (client, _incoming) = MockClient::new(sample_dialogs());
    let mock = Arc::new(client);

    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(serve_session(
        mock.clone(),
        WaitLimits::default(),
        server_io,
        std::future::pending::<()>(),
    ));

    let (read_half, write_half) = tokio::io::split(client_io);
    let mut peer = Peer {
        reader: BufReader::new(read_half).lines(),
        writer: write_half,
    };

    let init = peer.initialize().await;
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["serverInfo"]["name"], "telegram-mcp");
    assert!(
        init["result"]["capabilities"]["tools"].is_object(),
        "Missing tools capability"
    );

    peer.send(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }))
        .await;
    let list = peer.recv().await;
    let tools = list["result"]["tools"].as_array().expect("tools array");
    assert_eq!(tools.len(), 8);
    assert!(tools.iter().any(|t| t["name"] == "wait_for_reply"));
    assert!(tools
        .iter()
        .all(|t| t["inputSchema"]["type"] == "object"));

    peer.send(json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": { "name": "foo_bar", "arguments": {} }
    }))
    .await;
    let unknown = peer.recv().await;
    assert_eq!(unknown["id"], 3);
    assert_eq!(unknown["result"]["isError"], true);
    assert_eq!(unknown["result"]["content"][0]["text"], "Unknown tool: foo_bar");

    peer.send(json!({
        "jsonrpc": "2.0",
        "id": 4,
        "method": "tools/call",
        "params": { "name": "dialogs_list", "arguments": { "filter": { "onlyUsers": true } } }
    }))
    .await;
    let listed = peer.recv().await;
    assert_ne!(listed["result"]["isError"], true);
    let text = listed["result"]["content"][0]["text"].as_str().unwrap();
    let body: Value = serde_json::from_str(text).unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["dialogs"][0]["username"], "alice");

    // EOF on the client side ends the session.
    drop(peer);
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops after EOF")
        .unwrap()
        .unwrap();
    assert!(mock.disconnected.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_shutdown_signal_stops_session() {
    let (client, _incoming) = MockClient::new(sample_dialogs());
    let mock = Arc::new(client);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(serve_session(
        mock.clone(),
        WaitLimits::default(),
        server_io,
        async {
            let _ = stop_rx.await;
        },
    ));

    let (read_half, write_half) = tokio::io::split(client_io);
    let mut peer = Peer {
        reader: BufReader::new(read_half).lines(),
        writer: write_half,
    };
    peer.initialize().await;

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops on shutdown")
        .unwrap()
        .unwrap();
    assert!(mock.disconnected.load(Ordering::SeqCst));
}
