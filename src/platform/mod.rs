mod serenity_platform;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use bytes::Bytes;
use poise::serenity_prelude::{ChannelId, GuildId, PermissionOverwrite, ReactionType, UserId};

use crate::models::{AttachmentRef, MessageRef};

pub use serenity_platform::SerenityPlatform;

#[derive(thiserror::Error, Debug)]
pub enum PlatformError {
    #[error(transparent)]
    Serenity(#[from] serenity::Error),
    #[error("{message}")]
    Other { message: String },
}

pub fn platform_err(message: impl Into<String>) -> PlatformError {
    PlatformError::Other {
        message: message.into(),
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// A file to attach to an outgoing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub data: Bytes,
}

/// A message the bot has sent, with the file it carries if there was one.
#[derive(Clone, Debug)]
pub struct PostedMessage {
    pub message: MessageRef,
    pub attachment: Option<AttachmentRef>,
}

#[derive(Clone, Debug)]
pub struct NewTextChannel {
    pub guild: GuildId,
    pub category: ChannelId,
    pub name: String,
    pub topic: String,
    pub overwrites: Vec<PermissionOverwrite>,
}

/// Everything the map testing pipeline asks of the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn download_attachment(
        &self,
        message: MessageRef,
        attachment: &AttachmentRef,
    ) -> PlatformResult<Bytes>;

    /// Reactions currently present on the message, one entry per distinct emoji.
    async fn reactions(&self, message: MessageRef) -> PlatformResult<Vec<ReactionType>>;

    /// The complete list of users who reacted with `reaction`, all pages included.
    async fn reaction_users(
        &self,
        message: MessageRef,
        reaction: &ReactionType,
    ) -> PlatformResult<Vec<UserId>>;

    async fn add_reaction(&self, message: MessageRef, reaction: &ReactionType)
        -> PlatformResult<()>;

    async fn clear_reactions(&self, message: MessageRef) -> PlatformResult<()>;

    async fn permission_overwrites(
        &self,
        channel: ChannelId,
    ) -> PlatformResult<Vec<PermissionOverwrite>>;

    async fn create_text_channel(&self, channel: NewTextChannel) -> PlatformResult<ChannelId>;

    async fn send_message(
        &self,
        guild: GuildId,
        channel: ChannelId,
        content: String,
        file: Option<FileUpload>,
    ) -> PlatformResult<PostedMessage>;

    async fn send_direct_message(&self, user: UserId, content: String) -> PlatformResult<()>;

    async fn pin(&self, message: MessageRef) -> PlatformResult<()>;
}

