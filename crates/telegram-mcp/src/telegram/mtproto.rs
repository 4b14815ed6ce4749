//! MTProto client backed by grammers.
//!
//! Every chat seen in a response (dialogs, message senders, resolved
//! usernames) is cached so later calls can address it without another
//! round trip.

use async_trait::async_trait;
use chrono::Utc;
use grammers_client::types::{Chat, Downloadable, InputMessage, Media as TgMedia, PackedChat};
use grammers_client::{Client, Config, InitParams, Update};
use grammers_session::Session;
use grammers_tl_types as tl;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tgconf::TelegramConfig;
use tracing::{debug, info};

use super::{
    ChatRef, Dialog, DownloadedMedia, FullInfo, Media, Message, Peer, PeerKind, TelegramClient,
};
use crate::error::ClientError;

/// Open a connection using the configured session file, creating the file
/// (and its directory) when missing. The session may still be unauthorized.
pub async fn open(config: &TelegramConfig) -> Result<Client, ClientError> {
    if let Some(parent) = config.session_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let session = Session::load_file_or_create(&config.session_path)?;

    Client::connect(Config {
        session,
        api_id: config.api_id,
        api_hash: config.api_hash.clone(),
        params: InitParams {
            catch_up: false,
            ..Default::default()
        },
    })
    .await
    .map_err(invocation)
}

pub struct MtprotoClient {
    client: Client,
    session_path: PathBuf,
    chats: Mutex<HashMap<i64, Chat>>,
    connected: AtomicBool,
}

impl MtprotoClient {
    /// Connect with an already authorized session.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, ClientError> {
        let client = open(config).await?;
        if !client.is_authorized().await.map_err(invocation)? {
            return Err(ClientError::NotAuthorized);
        }

        let me = client.get_me().await.map_err(invocation)?;
        info!(
            user_id = me.id(),
            username = me.username().unwrap_or(""),
            "Logged in as {}",
            me.full_name()
        );

        Ok(Self {
            client,
            session_path: config.session_path.clone(),
            chats: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
        })
    }

    fn remember(&self, chat: &Chat) {
        let mut chats = self.chats.lock().unwrap_or_else(|e| e.into_inner());
        chats.insert(marked_id(chat), chat.clone());
    }

    /// Look up a chat by its marked id.
    fn cached(&self, marked_id: i64) -> Option<Chat> {
        let chats = self.chats.lock().unwrap_or_else(|e| e.into_inner());
        chats.get(&marked_id).cloned()
    }

    async fn packed(&self, peer: &Peer) -> Result<PackedChat, ClientError> {
        let marked = peer.marked_id();
        if let Some(chat) = self.cached(marked) {
            return Ok(chat.pack());
        }
        self.resolve_chat(&ChatRef::Id(marked)).await?;
        self.cached(marked)
            .map(|chat| chat.pack())
            .ok_or_else(|| ClientError::PeerNotFound(marked.to_string()))
    }

    fn convert_message(&self, message: &grammers_client::types::Message) -> Message {
        let chat = message.chat();
        self.remember(&chat);
        let sender = message.sender();
        if let Some(ref sender) = sender {
            self.remember(sender);
        }

        Message {
            id: message.id(),
            date: message.date(),
            text: message.text().to_string(),
            chat: peer_from_chat(&chat),
            sender: sender.as_ref().map(peer_from_chat),
            outgoing: message.outgoing(),
            reply_to: message.reply_to_message_id(),
            media: message_media(message),
        }
    }

    fn convert_dialog(&self, dialog: &grammers_client::types::Dialog) -> Dialog {
        self.remember(dialog.chat());

        let (pinned, unread_count, unread_mentions_count, muted) = match &dialog.raw {
            tl::enums::Dialog::Dialog(d) => (
                d.pinned,
                d.unread_count,
                d.unread_mentions_count,
                is_muted(&d.notify_settings),
            ),
            tl::enums::Dialog::Folder(f) => (f.pinned, 0, 0, false),
        };

        Dialog {
            peer: peer_from_chat(dialog.chat()),
            unread_count,
            unread_mentions_count,
            pinned,
            muted,
            last_message: dialog
                .last_message
                .as_ref()
                .map(|m| self.convert_message(m)),
        }
    }
}

#[async_trait]
impl TelegramClient for MtprotoClient {
    async fn list_dialogs(&self, limit: usize) -> Result<Vec<Dialog>, ClientError> {
        let mut iter = self.client.iter_dialogs().limit(limit);

        let mut dialogs = Vec::new();
        while let Some(dialog) = iter.next().await.map_err(invocation)? {
            dialogs.push(self.convert_dialog(&dialog));
        }
        debug!(count = dialogs.len(), "Fetched dialogs");
        Ok(dialogs)
    }

    async fn scan_dialogs(
        &self,
        keep: &(dyn for<'d> Fn(&'d Dialog) -> bool + Send + Sync),
        limit: usize,
    ) -> Result<Vec<Dialog>, ClientError> {
        let mut iter = self.client.iter_dialogs();
        let mut scanned = 0usize;
        let mut dialogs = Vec::new();
        while dialogs.len() < limit {
            let Some(dialog) = iter.next().await.map_err(invocation)? else {
                break;
            };
            scanned += 1;
            let dialog = self.convert_dialog(&dialog);
            if keep(&dialog) {
                dialogs.push(dialog);
            }
        }
        debug!(scanned, kept = dialogs.len(), "Scanned dialogs");
        Ok(dialogs)
    }

    async fn resolve_chat(&self, chat: &ChatRef) -> Result<Peer, ClientError> {
        match chat {
            ChatRef::Username(name) => {
                let found = self
                    .client
                    .resolve_username(name)
                    .await
                    .map_err(invocation)?
                    .ok_or_else(|| ClientError::PeerNotFound(chat.to_string()))?;
                self.remember(&found);
                Ok(peer_from_chat(&found))
            }
            ChatRef::Id(id) => {
                if let Some(cached) = self.cached(*id) {
                    return Ok(peer_from_chat(&cached));
                }
                // Access hashes only come from the server, so walk the dialogs.
                let mut fallback = None;
                let mut dialogs = self.client.iter_dialogs();
                while let Some(dialog) = dialogs.next().await.map_err(invocation)? {
                    self.remember(dialog.chat());
                    let peer = peer_from_chat(dialog.chat());
                    if peer.matches(chat) {
                        return Ok(peer);
                    }
                    if fallback.is_none() && peer.matches_bare_id(chat) {
                        fallback = Some(peer);
                    }
                }
                fallback.ok_or_else(|| ClientError::PeerNotFound(chat.to_string()))
            }
        }
    }

    async fn full_info(&self, peer: &Peer) -> Result<FullInfo, ClientError> {
        let packed = self.packed(peer).await?;

        if let Some(id) = packed.try_to_input_user() {
            let tl::enums::users::UserFull::Full(response) = self
                .client
                .invoke(&tl::functions::users::GetFullUser { id })
                .await
                .map_err(invocation)?;
            let tl::enums::UserFull::Full(user) = response.full_user;
            return Ok(FullInfo::User {
                bio: user.about.filter(|s| !s.is_empty()),
                common_chats_count: user.common_chats_count,
                blocked: user.blocked,
            });
        }

        let response = if let Some(chat_id) = packed.try_to_chat_id() {
            self.client
                .invoke(&tl::functions::messages::GetFullChat { chat_id })
                .await
        } else if let Some(channel) = packed.try_to_input_channel() {
            self.client
                .invoke(&tl::functions::channels::GetFullChannel { channel })
                .await
        } else {
            return Err(ClientError::PeerNotFound(peer.id.to_string()));
        };
        let tl::enums::messages::ChatFull::Full(response) = response.map_err(invocation)?;

        Ok(match response.full_chat {
            tl::enums::ChatFull::Full(chat) => FullInfo::Chat {
                bio: Some(chat.about).filter(|s| !s.is_empty()),
                participants_count: match chat.participants {
                    tl::enums::ChatParticipants::Participants(p) => {
                        Some(p.participants.len() as i32)
                    }
                    tl::enums::ChatParticipants::Forbidden(_) => None,
                },
                admins_count: None,
                online_count: None,
            },
            tl::enums::ChatFull::ChannelFull(channel) => FullInfo::Chat {
                bio: Some(channel.about).filter(|s| !s.is_empty()),
                participants_count: channel.participants_count,
                admins_count: channel.admins_count,
                online_count: channel.online_count,
            },
        })
    }

    async fn send_text(
        &self,
        peer: &Peer,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<Message, ClientError> {
        let packed = self.packed(peer).await?;
        let sent = self
            .client
            .send_message(packed, InputMessage::text(text).reply_to(reply_to))
            .await
            .map_err(invocation)?;
        Ok(self.convert_message(&sent))
    }

    async fn get_history(
        &self,
        peer: &Peer,
        limit: usize,
        offset_id: Option<i32>,
    ) -> Result<Vec<Message>, ClientError> {
        let packed = self.packed(peer).await?;
        let mut iter = self.client.iter_messages(packed).limit(limit);
        if let Some(offset_id) = offset_id {
            iter = iter.offset_id(offset_id);
        }

        let mut messages = Vec::new();
        while let Some(message) = iter.next().await.map_err(invocation)? {
            messages.push(self.convert_message(&message));
        }
        Ok(messages)
    }

    async fn search(
        &self,
        peer: Option<&Peer>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ClientError> {
        let mut messages = Vec::new();
        match peer {
            Some(peer) => {
                let packed = self.packed(peer).await?;
                let mut iter = self.client.search_messages(packed).query(query).limit(limit);
                while let Some(message) = iter.next().await.map_err(invocation)? {
                    messages.push(self.convert_message(&message));
                }
            }
            None => {
                let mut iter = self.client.search_all_messages().query(query).limit(limit);
                while let Some(message) = iter.next().await.map_err(invocation)? {
                    messages.push(self.convert_message(&message));
                }
            }
        }
        Ok(messages)
    }

    async fn get_message(&self, peer: &Peer, id: i32) -> Result<Option<Message>, ClientError> {
        let packed = self.packed(peer).await?;
        let found = self
            .client
            .get_messages_by_id(packed, &[id])
            .await
            .map_err(invocation)?;
        Ok(found
            .into_iter()
            .next()
            .flatten()
            .map(|m| self.convert_message(&m)))
    }

    async fn download_media(
        &self,
        peer: &Peer,
        message_id: i32,
    ) -> Result<Option<DownloadedMedia>, ClientError> {
        let packed = self.packed(peer).await?;
        let found = self
            .client
            .get_messages_by_id(packed, &[message_id])
            .await
            .map_err(invocation)?;
        let Some(media) = found.into_iter().next().flatten().and_then(|m| m.media()) else {
            return Ok(None);
        };

        let converted = convert_media(&media);
        if !converted.is_downloadable() {
            return Ok(None);
        }

        let mut download = self.client.iter_download(&Downloadable::Media(media));
        let mut bytes = Vec::new();
        while let Some(chunk) = download.next().await.map_err(invocation)? {
            bytes.extend(chunk);
        }
        debug!(message_id, bytes = bytes.len(), "Downloaded media");

        Ok(Some(DownloadedMedia {
            media: converted,
            bytes,
        }))
    }

    async fn next_message(&self) -> Result<Option<Message>, ClientError> {
        loop {
            if !self.connected.load(Ordering::Acquire) {
                return Ok(None);
            }
            match self.client.next_update().await.map_err(invocation)? {
                Update::NewMessage(message) => return Ok(Some(self.convert_message(&message))),
                _ => continue,
            }
        }
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.client.sync_update_state();
        self.client.session().save_to_file(&self.session_path)?;
        info!(path = %self.session_path.display(), "Session saved");
        Ok(())
    }
}

fn invocation(err: impl std::fmt::Display) -> ClientError {
    ClientError::Invocation(err.to_string())
}

fn peer_kind(chat: &Chat) -> PeerKind {
    match chat {
        Chat::User(_) => PeerKind::User,
        Chat::Group(group) => match group.raw {
            tl::enums::Chat::Channel(_) | tl::enums::Chat::ChannelForbidden(_) => {
                PeerKind::Supergroup
            }
            _ => PeerKind::Group,
        },
        Chat::Channel(_) => PeerKind::Channel,
    }
}

fn marked_id(chat: &Chat) -> i64 {
    peer_kind(chat).mark(chat.id())
}

fn peer_from_chat(chat: &Chat) -> Peer {
    let name = match chat {
        Chat::User(user) => user.full_name(),
        Chat::Group(group) => group.title().to_string(),
        Chat::Channel(channel) => channel.title().to_string(),
    };
    Peer {
        id: chat.id(),
        kind: peer_kind(chat),
        name,
        username: chat.username().map(String::from),
    }
}

fn is_muted(settings: &tl::enums::PeerNotifySettings) -> bool {
    let tl::enums::PeerNotifySettings::Settings(settings) = settings;
    settings
        .mute_until
        .is_some_and(|until| i64::from(until) > Utc::now().timestamp())
}

/// Raw media kinds the high-level client drops are kept as tagged unknowns.
fn message_media(message: &grammers_client::types::Message) -> Option<Media> {
    use tl::enums::MessageMedia as M;

    let tag = match message.raw.media.as_ref()? {
        M::Empty | M::Unsupported => return None,
        M::Game(_) => "game",
        M::Invoice(_) => "invoice",
        M::Story(_) => "story",
        M::Giveaway(_) => "giveaway",
        M::GiveawayResults(_) => "giveaway_results",
        M::PaidMedia(_) => "paid_media",
        _ => return message.media().map(|m| convert_media(&m)),
    };
    Some(Media::Unknown(tag.to_string()))
}

fn convert_media(media: &TgMedia) -> Media {
    match media {
        TgMedia::Photo(photo) => Media::Photo {
            id: photo.id(),
            size: photo.size(),
        },
        TgMedia::Document(document) => convert_document(document),
        TgMedia::Sticker(sticker) => Media::Sticker {
            id: sticker.document.id(),
            emoji: sticker.emoji().to_string(),
            animated: sticker.is_animated(),
        },
        TgMedia::Contact(contact) => Media::Contact {
            phone_number: contact.phone_number().to_string(),
            first_name: contact.first_name().to_string(),
            last_name: contact.last_name().to_string(),
            user_id: Some(contact.raw.user_id).filter(|id| *id != 0),
        },
        TgMedia::Poll(poll) => {
            let tl::enums::TextWithEntities::Entities(question) = poll.question();
            Media::Poll {
                id: poll.raw.id,
                question: question.text.clone(),
                closed: poll.closed(),
                total_voters: poll.total_voters(),
            }
        }
        TgMedia::Geo(geo) => Media::Location {
            latitude: geo.latitue(),
            longitude: geo.longitude(),
            accuracy_radius: geo.accuracy_radius(),
            title: None,
            address: None,
        },
        TgMedia::Venue(venue) => match venue.geo {
            Some(ref geo) => Media::Location {
                latitude: geo.latitue(),
                longitude: geo.longitude(),
                accuracy_radius: geo.accuracy_radius(),
                title: Some(venue.raw_venue.title.clone()),
                address: Some(venue.raw_venue.address.clone()),
            },
            None => Media::Unknown("venue".to_string()),
        },
        TgMedia::GeoLive(live) => match live.geo {
            Some(ref geo) => Media::Location {
                latitude: geo.latitue(),
                longitude: geo.longitude(),
                accuracy_radius: geo.accuracy_radius(),
                title: None,
                address: None,
            },
            None => Media::Unknown("live_location".to_string()),
        },
        TgMedia::Dice(_) => Media::Unknown("dice".to_string()),
        TgMedia::WebPage(page) => convert_web_page(&page.raw.webpage),
        _ => Media::Unknown("unsupported".to_string()),
    }
}

/// Documents are split into voice notes, audio, video and plain files by
/// their attributes.
fn convert_document(document: &grammers_client::types::media::Document) -> Media {
    let attributes: &[tl::enums::DocumentAttribute] = match document.raw.document {
        Some(tl::enums::Document::Document(ref raw)) => &raw.attributes,
        _ => &[],
    };

    let id = document.id();
    let mime_type = document.mime_type().map(String::from);
    let size = document.size();
    let file_name = Some(document.name())
        .filter(|name| !name.is_empty())
        .map(String::from);

    for attribute in attributes {
        match attribute {
            tl::enums::DocumentAttribute::Audio(audio) if audio.voice => {
                return Media::Voice {
                    id,
                    mime_type,
                    size,
                    duration: document.duration(),
                };
            }
            tl::enums::DocumentAttribute::Audio(_) => {
                return Media::Audio {
                    id,
                    mime_type,
                    size,
                    duration: document.duration(),
                    title: document.audio_title(),
                    performer: document.performer(),
                };
            }
            tl::enums::DocumentAttribute::Video(_) => {
                let (width, height) = document.resolution().unzip();
                return Media::Video {
                    id,
                    mime_type,
                    size,
                    duration: document.duration(),
                    width,
                    height,
                    file_name,
                };
            }
            _ => {}
        }
    }

    Media::Document {
        id,
        mime_type,
        size,
        file_name,
    }
}

fn convert_web_page(page: &tl::enums::WebPage) -> Media {
    match page {
        tl::enums::WebPage::Page(page) => Media::WebPage {
            id: page.id,
            url: Some(page.url.clone()),
            title: page.title.clone(),
            description: page.description.clone(),
            site_name: page.site_name.clone(),
        },
        tl::enums::WebPage::Empty(page) => Media::WebPage {
            id: page.id,
            url: page.url.clone(),
            title: None,
            description: None,
            site_name: None,
        },
        tl::enums::WebPage::Pending(page) => Media::WebPage {
            id: page.id,
            url: page.url.clone(),
            title: None,
            description: None,
            site_name: None,
        },
        tl::enums::WebPage::NotModified(_) => Media::Unknown("webpage".to_string()),
    }
}
