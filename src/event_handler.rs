use poise::serenity_prelude::{Context, FullEvent, Message};
use tracing::debug;

use crate::{
    models::{AttachmentRef, InitialSubmission, MessageRef, SourceChannel, Submission, MAP_EXTENSION},
    BotError, BotState,
};

pub async fn handle_event(
    ctx: &Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, BotState, BotError>,
    data: &BotState,
) -> Result<(), BotError> {
    if let FullEvent::Message { new_message } = event {
        if let Some(submission) = map_submission(ctx, new_message).await? {
            data.map_testing.spawn(submission);
        }
    }

    Ok(())
}

/// Turns a guild message carrying exactly one `.map` file into a submission.
async fn map_submission(
    ctx: &Context,
    message: &Message,
) -> Result<Option<InitialSubmission>, BotError> {
    if message.author.bot {
        return Ok(None);
    }

    let Some(guild) = message.guild_id else {
        return Ok(None);
    };

    let [attachment] = &message.attachments[..] else {
        return Ok(None);
    };
    if !attachment.filename.ends_with(MAP_EXTENSION) {
        return Ok(None);
    }

    let Some(channel) = message.channel_id.to_channel(ctx).await?.guild() else {
        return Ok(None);
    };

    debug!(
        "Map {:?} posted by {} in #{}",
        attachment.filename, message.author.name, channel.name
    );

    let submission = Submission::new(
        MessageRef {
            guild,
            channel: message.channel_id,
            id: message.id,
        },
        message.author.id,
        SourceChannel {
            id: channel.id,
            category: channel.parent_id,
            topic: channel.topic,
        },
        AttachmentRef {
            id: attachment.id,
            filename: attachment.filename.clone(),
        },
    );

    Ok(Some(InitialSubmission::new(
        submission,
        message.content.clone(),
    )))
}
