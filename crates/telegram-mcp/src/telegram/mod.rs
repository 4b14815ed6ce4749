//! Telegram domain types and the client seam.
//!
//! Tools only ever see the records in this module. The MTProto-backed
//! implementation lives in [`mtproto`]; tests substitute an in-memory client.

pub mod mtproto;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::ClientError;

/// What kind of conversation a peer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    User,
    /// Basic group.
    Group,
    /// Megagroup. Shares the channel id space but reports as a group.
    Supergroup,
    /// Broadcast channel.
    Channel,
}

const CHANNEL_MARK: i64 = -1_000_000_000_000;

impl PeerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerKind::User => "user",
            PeerKind::Group | PeerKind::Supergroup => "group",
            PeerKind::Channel => "channel",
        }
    }

    /// Bot API marked form of a bare id of this kind.
    pub fn mark(&self, id: i64) -> i64 {
        match self {
            PeerKind::User => id,
            PeerKind::Group => -id,
            PeerKind::Supergroup | PeerKind::Channel => CHANNEL_MARK - id,
        }
    }
}

/// The addressable counterpart of a dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct Peer {
    pub id: i64,
    pub kind: PeerKind,
    pub name: String,
    pub username: Option<String>,
}

impl Peer {
    /// Name, then username, then a generic label built from the id.
    pub fn display_name(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        if let Some(ref username) = self.username {
            return username.clone();
        }
        match self.kind {
            PeerKind::User => format!("User {}", self.id),
            PeerKind::Group | PeerKind::Supergroup | PeerKind::Channel => {
                format!("Chat {}", self.id)
            }
        }
    }

    /// Bare ids collide across kinds; the marked id does not.
    pub fn marked_id(&self) -> i64 {
        self.kind.mark(self.id)
    }

    /// Key used to register reply waits and to match incoming messages.
    pub fn chat_key(&self) -> String {
        self.marked_id().to_string()
    }

    /// Exact match on the marked id or the username.
    pub fn matches(&self, chat: &ChatRef) -> bool {
        match chat {
            ChatRef::Id(id) => self.marked_id() == *id,
            ChatRef::Username(name) => self
                .username
                .as_deref()
                .is_some_and(|u| u.eq_ignore_ascii_case(name)),
        }
    }

    /// A positive id may also name a group or channel by its bare id.
    pub fn matches_bare_id(&self, chat: &ChatRef) -> bool {
        matches!(chat, ChatRef::Id(id) if *id > 0 && self.kind != PeerKind::User && self.id == *id)
    }
}

/// A caller-supplied chat identifier, either numeric or a username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    Id(i64),
    Username(String),
}

impl ChatRef {
    /// Parse a chat id argument.
    ///
    /// Accepts ids (Bot API marked form: `-123` for groups, `-100123` for
    /// supergroups and channels) and usernames with or without `@`. Ids stay
    /// marked so the peer kind survives until resolution.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(id) = raw.parse::<i64>() {
            return Some(ChatRef::Id(id));
        }
        let name = raw.strip_prefix('@').unwrap_or(raw);
        let name = name
            .strip_prefix("https://t.me/")
            .or_else(|| name.strip_prefix("t.me/"))
            .unwrap_or(name);
        if name.is_empty() {
            return None;
        }
        Some(ChatRef::Username(name.to_string()))
    }

    /// Pick the peer this reference names. Exact matches win; otherwise the
    /// first group or channel whose bare id equals a positive id.
    pub fn select<'a, T>(
        &self,
        items: impl IntoIterator<Item = &'a T>,
        peer_of: impl Fn(&T) -> &Peer,
    ) -> Option<&'a T>
    where
        T: 'a,
    {
        let mut fallback = None;
        for item in items {
            let peer = peer_of(item);
            if peer.matches(self) {
                return Some(item);
            }
            if fallback.is_none() && peer.matches_bare_id(self) {
                fallback = Some(item);
            }
        }
        fallback
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRef::Id(id) => write!(f, "{}", id),
            ChatRef::Username(name) => write!(f, "@{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i32,
    pub date: DateTime<Utc>,
    pub text: String,
    pub chat: Peer,
    pub sender: Option<Peer>,
    pub outgoing: bool,
    pub reply_to: Option<i32>,
    pub media: Option<Media>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dialog {
    pub peer: Peer,
    pub unread_count: i32,
    pub unread_mentions_count: i32,
    pub pinned: bool,
    pub muted: bool,
    pub last_message: Option<Message>,
}

/// Extra profile information fetched on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum FullInfo {
    User {
        bio: Option<String>,
        common_chats_count: i32,
        blocked: bool,
    },
    Chat {
        bio: Option<String>,
        participants_count: Option<i32>,
        admins_count: Option<i32>,
        online_count: Option<i32>,
    },
}

/// Media attached to a message.
///
/// Kinds the client reports but that have no variant here end up as
/// `Unknown` carrying their tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Media {
    Photo {
        id: i64,
        size: i64,
    },
    Video {
        id: i64,
        mime_type: Option<String>,
        size: i64,
        duration: Option<f64>,
        width: Option<i32>,
        height: Option<i32>,
        file_name: Option<String>,
    },
    Document {
        id: i64,
        mime_type: Option<String>,
        size: i64,
        file_name: Option<String>,
    },
    Audio {
        id: i64,
        mime_type: Option<String>,
        size: i64,
        duration: Option<f64>,
        title: Option<String>,
        performer: Option<String>,
    },
    Voice {
        id: i64,
        mime_type: Option<String>,
        size: i64,
        duration: Option<f64>,
    },
    Sticker {
        id: i64,
        emoji: String,
        animated: bool,
    },
    Location {
        latitude: f64,
        longitude: f64,
        accuracy_radius: Option<i32>,
        title: Option<String>,
        address: Option<String>,
    },
    Contact {
        phone_number: String,
        first_name: String,
        last_name: String,
        user_id: Option<i64>,
    },
    Poll {
        id: i64,
        question: String,
        closed: bool,
        total_voters: Option<i32>,
    },
    WebPage {
        id: i64,
        url: Option<String>,
        title: Option<String>,
        description: Option<String>,
        site_name: Option<String>,
    },
    Unknown(String),
}

impl Media {
    pub fn tag(&self) -> &str {
        match self {
            Media::Photo { .. } => "photo",
            Media::Video { .. } => "video",
            Media::Document { .. } => "document",
            Media::Audio { .. } => "audio",
            Media::Voice { .. } => "voice",
            Media::Sticker { .. } => "sticker",
            Media::Location { .. } => "location",
            Media::Contact { .. } => "contact",
            Media::Poll { .. } => "poll",
            Media::WebPage { .. } => "webpage",
            Media::Unknown(tag) => tag,
        }
    }

    /// Whether the media carries a file that can be downloaded.
    pub fn is_downloadable(&self) -> bool {
        matches!(
            self,
            Media::Photo { .. }
                | Media::Video { .. }
                | Media::Document { .. }
                | Media::Audio { .. }
                | Media::Voice { .. }
                | Media::Sticker { .. }
        )
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Media::Photo { .. } => Some("image/jpeg"),
            Media::Video { mime_type, .. }
            | Media::Document { mime_type, .. }
            | Media::Audio { mime_type, .. }
            | Media::Voice { mime_type, .. } => mime_type.as_deref(),
            Media::Sticker { animated, .. } => Some(if *animated {
                "application/x-tgsticker"
            } else {
                "image/webp"
            }),
            _ => None,
        }
    }
}

/// A downloaded media payload.
#[derive(Debug, Clone)]
pub struct DownloadedMedia {
    pub media: Media,
    pub bytes: Vec<u8>,
}

/// Operations the tools need from a Telegram account.
#[async_trait]
pub trait TelegramClient: Send + Sync {
    /// The first `limit` dialogs in the order Telegram returns them (pinned
    /// first, then by recent activity).
    async fn list_dialogs(&self, limit: usize) -> Result<Vec<Dialog>, ClientError>;

    /// Walk dialogs in order keeping those `keep` accepts, and stop fetching
    /// once `limit` are kept.
    async fn scan_dialogs(
        &self,
        keep: &(dyn for<'d> Fn(&'d Dialog) -> bool + Send + Sync),
        limit: usize,
    ) -> Result<Vec<Dialog>, ClientError>;

    /// Resolve a caller-supplied identifier to a peer.
    async fn resolve_chat(&self, chat: &ChatRef) -> Result<Peer, ClientError>;

    async fn full_info(&self, peer: &Peer) -> Result<FullInfo, ClientError>;

    async fn send_text(
        &self,
        peer: &Peer,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<Message, ClientError>;

    /// Newest first, starting below `offset_id` when given.
    async fn get_history(
        &self,
        peer: &Peer,
        limit: usize,
        offset_id: Option<i32>,
    ) -> Result<Vec<Message>, ClientError>;

    /// Search one chat, or every chat when `peer` is `None`.
    async fn search(
        &self,
        peer: Option<&Peer>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ClientError>;

    async fn get_message(&self, peer: &Peer, id: i32) -> Result<Option<Message>, ClientError>;

    /// Download the media of a message into memory. `Ok(None)` when the
    /// message has nothing downloadable.
    async fn download_media(
        &self,
        peer: &Peer,
        message_id: i32,
    ) -> Result<Option<DownloadedMedia>, ClientError>;

    /// Next new message seen by the account, or `None` once disconnected.
    async fn next_message(&self) -> Result<Option<Message>, ClientError>;

    async fn disconnect(&self) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(kind: PeerKind, name: &str, username: Option<&str>) -> Peer {
        Peer {
            id: 42,
            kind,
            name: name.to_string(),
            username: username.map(String::from),
        }
    }

    #[test]
    fn test_chat_ref_parse() {
        assert_eq!(ChatRef::parse("12345"), Some(ChatRef::Id(12345)));
        assert_eq!(ChatRef::parse("-12345"), Some(ChatRef::Id(-12345)));
        assert_eq!(
            ChatRef::parse("-1001234567890"),
            Some(ChatRef::Id(-1001234567890))
        );
        assert_eq!(
            ChatRef::parse("@alice"),
            Some(ChatRef::Username("alice".to_string()))
        );
        assert_eq!(
            ChatRef::parse("alice"),
            Some(ChatRef::Username("alice".to_string()))
        );
        assert_eq!(
            ChatRef::parse("https://t.me/durov"),
            Some(ChatRef::Username("durov".to_string()))
        );
        assert_eq!(ChatRef::parse("  "), None);
        assert_eq!(ChatRef::parse("@"), None);
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(peer(PeerKind::User, "Alice", Some("al")).display_name(), "Alice");
        assert_eq!(peer(PeerKind::User, "", Some("al")).display_name(), "al");
        assert_eq!(peer(PeerKind::User, "", None).display_name(), "User 42");
        assert_eq!(peer(PeerKind::Group, "", None).display_name(), "Chat 42");
    }

    #[test]
    fn test_peer_matches_username_case_insensitive() {
        let p = peer(PeerKind::User, "Alice", Some("Alice_W"));
        assert!(p.matches(&ChatRef::Username("alice_w".to_string())));
        assert!(p.matches(&ChatRef::Id(42)));
        assert!(!p.matches(&ChatRef::Id(43)));
    }

    #[test]
    fn test_marked_ids_keep_kinds_apart() {
        let user = peer(PeerKind::User, "Alice", None);
        let group = peer(PeerKind::Group, "Club", None);
        let supergroup = peer(PeerKind::Supergroup, "Big Club", None);
        let channel = peer(PeerKind::Channel, "News", None);

        assert_eq!(user.chat_key(), "42");
        assert_eq!(group.chat_key(), "-42");
        assert_eq!(supergroup.chat_key(), "-1000000000042");
        assert_eq!(channel.chat_key(), "-1000000000042");
        assert_eq!(supergroup.kind.as_str(), "group");

        let marked_group = ChatRef::parse("-42").unwrap();
        assert!(group.matches(&marked_group));
        assert!(!user.matches(&marked_group));
        assert!(channel.matches(&ChatRef::parse("-1000000000042").unwrap()));
        assert!(!group.matches(&ChatRef::Id(42)));
    }

    #[test]
    fn test_select_prefers_exact_over_bare_id() {
        let group = peer(PeerKind::Group, "Club", None);
        let user = peer(PeerKind::User, "Alice", None);

        let both = [group.clone(), user.clone()];
        let picked = ChatRef::Id(42).select(&both, |p| p);
        assert_eq!(picked.map(|p| p.kind), Some(PeerKind::User));

        let only_group = [group.clone()];
        let picked = ChatRef::Id(42).select(&only_group, |p| p);
        assert_eq!(picked.map(|p| p.kind), Some(PeerKind::Group));

        assert!(ChatRef::Id(-42).select(&[user], |p| p).is_none());
    }

    #[test]
    fn test_media_downloadable() {
        assert!(Media::Photo { id: 1, size: 10 }.is_downloadable());
        assert!(!Media::Unknown("dice".to_string()).is_downloadable());
        assert_eq!(Media::Unknown("dice".to_string()).tag(), "dice");
    }
}
