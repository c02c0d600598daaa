use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use poise::serenity_prelude::{
    ChannelId, ChannelType, CreateAttachment, CreateChannel, CreateMessage, GuildId, Http,
    PermissionOverwrite, ReactionType, UserId,
};
use tracing::debug;

use crate::{
    models::{AttachmentRef, MessageRef},
    platform::{
        platform_err, ChatPlatform, FileUpload, NewTextChannel, PlatformResult, PostedMessage,
    },
};

/// Reaction users are fetched in pages of this size, the most Discord hands out at once.
const REACTION_USERS_PAGE: u8 = 100;

pub struct SerenityPlatform {
    http: Arc<Http>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>) -> SerenityPlatform {
        SerenityPlatform { http }
    }
}

fn create_message(content: String, file: Option<FileUpload>) -> CreateMessage {
    let message = CreateMessage::new().content(content);

    match file {
        Some(file) => message.add_file(CreateAttachment::bytes(file.data.to_vec(), file.filename)),
        None => message,
    }
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    async fn download_attachment(
        &self,
        message: MessageRef,
        attachment: &AttachmentRef,
    ) -> PlatformResult<Bytes> {
        let fetched = message.channel.message(&self.http, message.id).await?;
        let found = fetched
            .attachments
            .iter()
            .find(|a| a.id == attachment.id)
            .ok_or_else(|| {
                platform_err(format!(
                    "Attachment {} is gone from message {}",
                    attachment.filename, message.id
                ))
            })?;

        debug!("Downloading {} ({} bytes)", found.filename, found.size);
        Ok(Bytes::from(found.download().await?))
    }

    async fn reactions(&self, message: MessageRef) -> PlatformResult<Vec<ReactionType>> {
        let fetched = message.channel.message(&self.http, message.id).await?;

        Ok(fetched
            .reactions
            .into_iter()
            .map(|reaction| reaction.reaction_type)
            .collect())
    }

    async fn reaction_users(
        &self,
        message: MessageRef,
        reaction: &ReactionType,
    ) -> PlatformResult<Vec<UserId>> {
        let mut users = Vec::new();
        let mut after = None;

        loop {
            let page = message
                .channel
                .reaction_users(
                    &self.http,
                    message.id,
                    reaction.clone(),
                    Some(REACTION_USERS_PAGE),
                    after,
                )
                .await?;

            let page_len = page.len();
            users.extend(page.into_iter().map(|user| user.id));

            if page_len < REACTION_USERS_PAGE as usize {
                break;
            }
            after = users.last().copied();
        }

        Ok(users)
    }

    async fn add_reaction(
        &self,
        message: MessageRef,
        reaction: &ReactionType,
    ) -> PlatformResult<()> {
        message
            .channel
            .create_reaction(&self.http, message.id, reaction.clone())
            .await?;
        Ok(())
    }

    async fn clear_reactions(&self, message: MessageRef) -> PlatformResult<()> {
        message
            .channel
            .delete_reactions(&self.http, message.id)
            .await?;
        Ok(())
    }

    async fn permission_overwrites(
        &self,
        channel: ChannelId,
    ) -> PlatformResult<Vec<PermissionOverwrite>> {
        let channel = channel
            .to_channel(&self.http)
            .await?
            .guild()
            .ok_or_else(|| platform_err(format!("Channel {channel} is not a guild channel")))?;

        Ok(channel.permission_overwrites)
    }

    async fn create_text_channel(&self, channel: NewTextChannel) -> PlatformResult<ChannelId> {
        let builder = CreateChannel::new(channel.name)
            .kind(ChannelType::Text)
            .category(channel.category)
            .topic(channel.topic)
            .permissions(channel.overwrites);

        let created = channel.guild.create_channel(&self.http, builder).await?;
        Ok(created.id)
    }

    async fn send_message(
        &self,
        guild: GuildId,
        channel: ChannelId,
        content: String,
        file: Option<FileUpload>,
    ) -> PlatformResult<PostedMessage> {
        let sent = channel
            .send_message(&self.http, create_message(content, file))
            .await?;

        Ok(PostedMessage {
            message: MessageRef {
                guild,
                channel,
                id: sent.id,
            },
            attachment: sent.attachments.first().map(|attachment| AttachmentRef {
                id: attachment.id,
                filename: attachment.filename.clone(),
            }),
        })
    }

    async fn send_direct_message(&self, user: UserId, content: String) -> PlatformResult<()> {
        user.direct_message(&self.http, CreateMessage::new().content(content))
            .await?;
        Ok(())
    }

    async fn pin(&self, message: MessageRef) -> PlatformResult<()> {
        message.channel.pin(&self.http, message.id).await?;
        Ok(())
    }
}
