//! Flat JSON records for tool output.
//!
//! Pure mapping from the domain types in [`crate::telegram`]; nothing here
//! touches the network.

use serde::Serialize;
use serde_json::{json, Value};

use crate::telegram::{Dialog, FullInfo, Media, Message, Peer};

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: i32,
    /// RFC 3339
    pub date: String,
    pub text: String,
    pub sender_id: i64,
    pub sender_name: String,
    pub sender_username: Option<String>,
    pub is_outgoing: bool,
    pub chat_id: i64,
    pub chat_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Value>,
}

/// Format a message. Channel posts have no sender, so the chat stands in.
pub fn format_message(msg: &Message) -> MessageRecord {
    let sender = msg.sender.as_ref().unwrap_or(&msg.chat);

    MessageRecord {
        id: msg.id,
        date: msg.date.to_rfc3339(),
        text: msg.text.clone(),
        sender_id: sender.id,
        sender_name: sender.display_name(),
        sender_username: sender.username.clone(),
        is_outgoing: msg.outgoing,
        chat_id: msg.chat.id,
        chat_name: msg.chat.display_name(),
        reply_to_message_id: msg.reply_to,
        media: msg.media.as_ref().map(format_media),
    }
}

pub fn format_messages(messages: &[Message]) -> Vec<MessageRecord> {
    messages.iter().map(format_message).collect()
}

// ============================================================================
// Dialogs & Peers
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageRecord {
    pub id: i32,
    pub date: String,
    pub text: String,
    pub is_outgoing: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogRecord {
    pub id: i64,
    pub name: String,
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub unread_count: i32,
    pub unread_mentions_count: i32,
    pub is_pinned: bool,
    pub is_muted: bool,
    pub last_message: Option<LastMessageRecord>,
}

pub fn format_dialog(dialog: &Dialog) -> DialogRecord {
    DialogRecord {
        id: dialog.peer.id,
        name: dialog.peer.display_name(),
        username: dialog.peer.username.clone(),
        kind: dialog.peer.kind.as_str(),
        unread_count: dialog.unread_count,
        unread_mentions_count: dialog.unread_mentions_count,
        is_pinned: dialog.pinned,
        is_muted: dialog.muted,
        last_message: dialog.last_message.as_ref().map(|m| LastMessageRecord {
            id: m.id,
            date: m.date.to_rfc3339(),
            text: m.text.clone(),
            is_outgoing: m.outgoing,
        }),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRecord {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub username: Option<String>,
    pub display_name: String,
}

pub fn format_peer(peer: &Peer) -> PeerRecord {
    PeerRecord {
        id: peer.id,
        kind: peer.kind.as_str(),
        username: peer.username.clone(),
        display_name: peer.display_name(),
    }
}

/// Short dialog header used by `messages_getRecent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentDialogRecord {
    pub id: i64,
    pub name: String,
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub last_message_date: Option<String>,
}

pub fn format_recent_dialog(dialog: &Dialog) -> RecentDialogRecord {
    RecentDialogRecord {
        id: dialog.peer.id,
        name: dialog.peer.display_name(),
        username: dialog.peer.username.clone(),
        kind: dialog.peer.kind.as_str(),
        last_message_date: dialog.last_message.as_ref().map(|m| m.date.to_rfc3339()),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum FullInfoRecord {
    User {
        bio: Option<String>,
        common_chats_count: i32,
        is_blocked: bool,
    },
    Chat {
        bio: Option<String>,
        participants_count: Option<i32>,
        admins_count: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        online_count: Option<i32>,
    },
}

pub fn format_full_info(info: &FullInfo) -> FullInfoRecord {
    match info {
        FullInfo::User {
            bio,
            common_chats_count,
            blocked,
        } => FullInfoRecord::User {
            bio: bio.clone(),
            common_chats_count: *common_chats_count,
            is_blocked: *blocked,
        },
        FullInfo::Chat {
            bio,
            participants_count,
            admins_count,
            online_count,
        } => FullInfoRecord::Chat {
            bio: bio.clone(),
            participants_count: *participants_count,
            admins_count: *admins_count,
            online_count: *online_count,
        },
    }
}

// ============================================================================
// Media
// ============================================================================

/// Format attached media as a record tagged by `type`.
///
/// Each kind carries only its own fields. Optional values are omitted when
/// absent, except on polls whose shape is fixed.
pub fn format_media(media: &Media) -> Value {
    let mut record = match media {
        Media::Photo { id, size } => json!({
            "type": "photo",
            "id": id.to_string(),
            "size": size,
        }),
        Media::Video {
            id,
            mime_type,
            size,
            duration,
            width,
            height,
            file_name,
        } => json!({
            "type": "video",
            "id": id.to_string(),
            "mimeType": mime_type,
            "size": size,
            "duration": duration,
            "width": width,
            "height": height,
            "fileName": file_name,
        }),
        Media::Document {
            id,
            mime_type,
            size,
            file_name,
        } => json!({
            "type": "document",
            "id": id.to_string(),
            "mimeType": mime_type,
            "size": size,
            "fileName": file_name,
        }),
        Media::Audio {
            id,
            mime_type,
            size,
            duration,
            title,
            performer,
        } => json!({
            "type": "audio",
            "id": id.to_string(),
            "mimeType": mime_type,
            "size": size,
            "duration": duration,
            "title": title,
            "performer": performer,
        }),
        Media::Voice {
            id,
            mime_type,
            size,
            duration,
        } => json!({
            "type": "voice",
            "id": id.to_string(),
            "mimeType": mime_type,
            "size": size,
            "duration": duration,
        }),
        Media::Sticker {
            id,
            emoji,
            animated,
        } => json!({
            "type": "sticker",
            "id": id.to_string(),
            "emoji": emoji,
            "isAnimated": animated,
        }),
        Media::Location {
            latitude,
            longitude,
            accuracy_radius,
            title,
            address,
        } => json!({
            "type": "location",
            "latitude": latitude,
            "longitude": longitude,
            "accuracyRadius": accuracy_radius,
            "title": title,
            "address": address,
        }),
        Media::Contact {
            phone_number,
            first_name,
            last_name,
            user_id,
        } => json!({
            "type": "contact",
            "phoneNumber": phone_number,
            "firstName": first_name,
            "lastName": last_name,
            "userId": user_id,
        }),
        Media::Poll {
            id,
            question,
            closed,
            total_voters,
        } => {
            return json!({
                "type": "poll",
                "id": id.to_string(),
                "question": question,
                "closed": closed,
                "totalVoters": total_voters,
            })
        }
        Media::WebPage {
            id,
            url,
            title,
            description,
            site_name,
        } => json!({
            "type": "webpage",
            "id": id.to_string(),
            "url": url,
            "title": title,
            "description": description,
            "siteName": site_name,
        }),
        Media::Unknown(tag) => return json!({ "type": tag }),
    };

    if let Some(fields) = record.as_object_mut() {
        fields.retain(|_, v| !v.is_null());
    }
    record
}
