//! In-memory Telegram account shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

use telegram_mcp::error::ClientError;
use telegram_mcp::telegram::{
    ChatRef, Dialog, DownloadedMedia, FullInfo, Media, Message, Peer, PeerKind, TelegramClient,
};

pub fn peer(id: i64, kind: PeerKind, name: &str, username: Option<&str>) -> Peer {
    Peer {
        id,
        kind,
        name: name.to_string(),
        username: username.map(String::from),
    }
}

pub fn message(id: i32, chat: &Peer, text: &str) -> Message {
    Message {
        id,
        date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, id.rem_euclid(60) as u32).unwrap(),
        text: text.to_string(),
        chat: chat.clone(),
        sender: Some(chat.clone()),
        outgoing: false,
        reply_to: None,
        media: None,
    }
}

pub fn dialog(peer: &Peer) -> Dialog {
    Dialog {
        peer: peer.clone(),
        unread_count: 0,
        unread_mentions_count: 0,
        pinned: false,
        muted: false,
        last_message: None,
    }
}

pub struct MockClient {
    dialogs: Vec<Dialog>,
    history: Mutex<HashMap<i64, Vec<Message>>>,
    media: HashMap<(i64, i32), Vec<u8>>,
    full_info: HashMap<i64, FullInfo>,
    pub sent: Mutex<Vec<(i64, String, Option<i32>)>>,
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<Message>>,
    pub disconnected: AtomicBool,
    /// Dialogs inspected by `scan_dialogs` so far.
    pub scanned: AtomicUsize,
}

impl MockClient {
    /// Returns the client and the sender that feeds `next_message`.
    pub fn new(dialogs: Vec<Dialog>) -> (Self, mpsc::UnboundedSender<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Self {
            dialogs,
            history: Mutex::new(HashMap::new()),
            media: HashMap::new(),
            full_info: HashMap::new(),
            sent: Mutex::new(Vec::new()),
            incoming: tokio::sync::Mutex::new(rx),
            disconnected: AtomicBool::new(false),
            scanned: AtomicUsize::new(0),
        };
        (client, tx)
    }

    /// Messages for a chat, newest first.
    pub fn with_history(self, chat_id: i64, messages: Vec<Message>) -> Self {
        self.history.lock().unwrap().insert(chat_id, messages);
        self
    }

    pub fn with_media(mut self, chat_id: i64, message_id: i32, bytes: &[u8]) -> Self {
        self.media.insert((chat_id, message_id), bytes.to_vec());
        self
    }

    pub fn with_full_info(mut self, chat_id: i64, info: FullInfo) -> Self {
        self.full_info.insert(chat_id, info);
        self
    }

    fn find(&self, peer: &Peer, id: i32) -> Option<Message> {
        let history = self.history.lock().unwrap();
        history
            .get(&peer.id)
            .and_then(|messages| messages.iter().find(|m| m.id == id).cloned())
    }
}

#[async_trait]
impl TelegramClient for MockClient {
    async fn list_dialogs(&self, limit: usize) -> Result<Vec<Dialog>, ClientError> {
        Ok(self.dialogs.iter().take(limit).cloned().collect())
    }

    async fn scan_dialogs(
        &self,
        keep: &(dyn for<'d> Fn(&'d Dialog) -> bool + Send + Sync),
        limit: usize,
    ) -> Result<Vec<Dialog>, ClientError> {
        let mut kept = Vec::new();
        for dialog in &self.dialogs {
            if kept.len() >= limit {
                break;
            }
            self.scanned.fetch_add(1, Ordering::SeqCst);
            if keep(dialog) {
                kept.push(dialog.clone());
            }
        }
        Ok(kept)
    }

    async fn resolve_chat(&self, chat: &ChatRef) -> Result<Peer, ClientError> {
        chat.select(&self.dialogs, |d| &d.peer)
            .map(|d| d.peer.clone())
            .ok_or_else(|| ClientError::PeerNotFound(chat.to_string()))
    }

    async fn full_info(&self, peer: &Peer) -> Result<FullInfo, ClientError> {
        Ok(self
            .full_info
            .get(&peer.id)
            .cloned()
            .unwrap_or(FullInfo::User {
                bio: None,
                common_chats_count: 0,
                blocked: false,
            }))
    }

    async fn send_text(
        &self,
        peer: &Peer,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<Message, ClientError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((peer.id, text.to_string(), reply_to));

        let mut message = message(1000 + sent.len() as i32, peer, text);
        message.sender = None;
        message.outgoing = true;
        message.reply_to = reply_to;
        Ok(message)
    }

    async fn get_history(
        &self,
        peer: &Peer,
        limit: usize,
        offset_id: Option<i32>,
    ) -> Result<Vec<Message>, ClientError> {
        let history = self.history.lock().unwrap();
        Ok(history
            .get(&peer.id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| offset_id.map_or(true, |offset| m.id < offset))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn search(
        &self,
        peer: Option<&Peer>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ClientError> {
        let history = self.history.lock().unwrap();
        Ok(history
            .iter()
            .filter(|(chat_id, _)| peer.map_or(true, |p| p.id == **chat_id))
            .flat_map(|(_, messages)| messages.iter())
            .filter(|m| m.text.contains(query))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_message(&self, peer: &Peer, id: i32) -> Result<Option<Message>, ClientError> {
        Ok(self.find(peer, id))
    }

    async fn download_media(
        &self,
        peer: &Peer,
        message_id: i32,
    ) -> Result<Option<DownloadedMedia>, ClientError> {
        let Some(media) = self.find(peer, message_id).and_then(|m| m.media) else {
            return Ok(None);
        };
        let bytes = self
            .media
            .get(&(peer.id, message_id))
            .cloned()
            .unwrap_or_default();
        Ok(Some(DownloadedMedia { media, bytes }))
    }

    async fn next_message(&self) -> Result<Option<Message>, ClientError> {
        Ok(self.incoming.lock().await.recv().await)
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Alice (user), Rust Chat (group) and News (channel).
pub fn sample_dialogs() -> Vec<Dialog> {
    vec![
        dialog(&peer(101, PeerKind::User, "Alice", Some("alice"))),
        dialog(&peer(202, PeerKind::Group, "Rust Chat", None)),
        dialog(&peer(303, PeerKind::Channel, "News", Some("news"))),
    ]
}

pub fn photo() -> Media {
    Media::Photo { id: 9, size: 3 }
}
