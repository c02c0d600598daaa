use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use bytes::Bytes;
use poise::serenity_prelude::{
    AttachmentId, ChannelId, GuildId, MessageId, PermissionOverwrite, ReactionType, UserId,
};

use crate::{
    models::{AttachmentRef, MessageRef},
    platform::{
        platform_err, ChatPlatform, FileUpload, NewTextChannel, PlatformResult, PostedMessage,
    },
};

pub const BOT_USER: UserId = UserId::new(999);

#[derive(Clone, Debug)]
pub struct SentMessage {
    pub message: MessageRef,
    pub content: String,
    pub file: Option<FileUpload>,
}

#[derive(Default)]
struct State {
    attachments: HashMap<MessageId, Bytes>,
    downloads: usize,
    reactions: HashMap<MessageId, Vec<(ReactionType, UserId)>>,
    clear_calls: usize,
    overwrites: HashMap<ChannelId, Vec<PermissionOverwrite>>,
    channels: Vec<(ChannelId, NewTextChannel)>,
    messages: Vec<SentMessage>,
    direct_messages: Vec<(UserId, String)>,
    pinned: Vec<MessageRef>,
    fail_direct_messages: bool,
    fail_reactions: bool,
    fail_channel_creation: bool,
    next_id: u64,
}

/// Keeps everything the pipeline does in memory, acting as the bot user.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> FakePlatform {
        FakePlatform {
            state: Mutex::new(State {
                next_id: 1_000_000,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("Fake platform state poisoned")
    }

    pub fn add_attachment(&self, message: MessageRef, data: &'static [u8]) {
        self.state()
            .attachments
            .insert(message.id, Bytes::from_static(data));
    }

    pub fn react(&self, message: MessageRef, emoji: &str, user: u64) {
        self.state()
            .reactions
            .entry(message.id)
            .or_default()
            .push((ReactionType::Unicode(emoji.to_owned()), UserId::new(user)));
    }

    pub fn set_overwrites(&self, channel: ChannelId, overwrites: Vec<PermissionOverwrite>) {
        self.state().overwrites.insert(channel, overwrites);
    }

    pub fn fail_direct_messages(&self) {
        self.state().fail_direct_messages = true;
    }

    pub fn fail_reactions(&self) {
        self.state().fail_reactions = true;
    }

    pub fn fail_channel_creation(&self) {
        self.state().fail_channel_creation = true;
    }

    pub fn downloads(&self) -> usize {
        self.state().downloads
    }

    pub fn clear_calls(&self) -> usize {
        self.state().clear_calls
    }

    /// Emojis on the message, in the order they were added.
    pub fn markers(&self, message: MessageRef) -> Vec<String> {
        self.state()
            .reactions
            .get(&message.id)
            .map(|reactions| {
                reactions
                    .iter()
                    .map(|(reaction, _)| reaction.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn channels(&self) -> Vec<(ChannelId, NewTextChannel)> {
        self.state().channels.clone()
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.state().messages.clone()
    }

    pub fn direct_messages(&self) -> Vec<(UserId, String)> {
        self.state().direct_messages.clone()
    }

    pub fn pinned(&self) -> Vec<MessageRef> {
        self.state().pinned.clone()
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn download_attachment(
        &self,
        message: MessageRef,
        _attachment: &AttachmentRef,
    ) -> PlatformResult<Bytes> {
        let mut state = self.state();
        state.downloads += 1;
        state
            .attachments
            .get(&message.id)
            .cloned()
            .ok_or_else(|| platform_err("Unknown attachment"))
    }

    async fn reactions(&self, message: MessageRef) -> PlatformResult<Vec<ReactionType>> {
        let mut distinct: Vec<ReactionType> = Vec::new();
        for (reaction, _) in self.state().reactions.get(&message.id).into_iter().flatten() {
            if !distinct.contains(reaction) {
                distinct.push(reaction.clone());
            }
        }
        Ok(distinct)
    }

    async fn reaction_users(
        &self,
        message: MessageRef,
        reaction: &ReactionType,
    ) -> PlatformResult<Vec<UserId>> {
        Ok(self
            .state()
            .reactions
            .get(&message.id)
            .into_iter()
            .flatten()
            .filter(|(r, _)| r == reaction)
            .map(|(_, user)| *user)
            .collect())
    }

    async fn add_reaction(
        &self,
        message: MessageRef,
        reaction: &ReactionType,
    ) -> PlatformResult<()> {
        let mut state = self.state();
        if state.fail_reactions {
            return Err(platform_err("You are being rate limited"));
        }
        let reactions = state.reactions.entry(message.id).or_default();
        let entry = (reaction.clone(), BOT_USER);
        if !reactions.contains(&entry) {
            reactions.push(entry);
        }
        Ok(())
    }

    async fn clear_reactions(&self, message: MessageRef) -> PlatformResult<()> {
        let mut state = self.state();
        state.clear_calls += 1;
        state.reactions.remove(&message.id);
        Ok(())
    }

    async fn permission_overwrites(
        &self,
        channel: ChannelId,
    ) -> PlatformResult<Vec<PermissionOverwrite>> {
        Ok(self
            .state()
            .overwrites
            .get(&channel)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_text_channel(&self, channel: NewTextChannel) -> PlatformResult<ChannelId> {
        let mut state = self.state();
        if state.fail_channel_creation {
            return Err(platform_err("Missing Permissions"));
        }

        state.next_id += 1;
        let id = ChannelId::new(state.next_id);
        state.channels.push((id, channel));
        Ok(id)
    }

    async fn send_message(
        &self,
        guild: GuildId,
        channel: ChannelId,
        content: String,
        file: Option<FileUpload>,
    ) -> PlatformResult<PostedMessage> {
        let mut state = self.state();
        state.next_id += 1;
        let message = MessageRef {
            guild,
            channel,
            id: MessageId::new(state.next_id),
        };
        let attachment = file.as_ref().map(|file| AttachmentRef {
            id: AttachmentId::new(message.id.get()),
            filename: file.filename.clone(),
        });
        state.messages.push(SentMessage {
            message,
            content,
            file,
        });
        Ok(PostedMessage {
            message,
            attachment,
        })
    }

    async fn send_direct_message(&self, user: UserId, content: String) -> PlatformResult<()> {
        let mut state = self.state();
        if state.fail_direct_messages {
            return Err(platform_err("Cannot send messages to this user"));
        }
        state.direct_messages.push((user, content));
        Ok(())
    }

    async fn pin(&self, message: MessageRef) -> PlatformResult<()> {
        self.state().pinned.push(message);
        Ok(())
    }
}
