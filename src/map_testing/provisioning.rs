use poise::serenity_prelude::{
    Mentionable, PermissionOverwrite, PermissionOverwriteType, Permissions, UserId,
};
use tracing::info;

use crate::{
    map_testing::{thumbnail::ThumbnailRenderer, ProcessError},
    models::{InitialSubmission, MapDetails, MessageRef, SourceChannel, Submission},
    platform::{ChatPlatform, FileUpload, NewTextChannel, PlatformResult},
    utils::text::human_join,
};

const PREVIEW_URL: &str = "https://ddnet.org/testmaps/?map=";

pub fn preview_url(stem: &str) -> String {
    format!("{PREVIEW_URL}{stem}")
}

pub fn channel_name(details: &MapDetails<'_>) -> String {
    format!("{}{}", details.server.glyph(), details.name)
}

/// Three lines: what the map is, who may resubmit which file, where to preview it.
///
/// The second line is the one [`InitialSubmission::can_bypass`] reads back.
pub fn channel_topic(details: &MapDetails<'_>, mention: &str, filename: &str, stem: &str) -> String {
    let mappers = details
        .mappers
        .iter()
        .map(|mapper| format!("**{mapper}**"))
        .collect::<Vec<_>>();

    format!(
        "**\"{}\"** by {} [{}]\n{} | {}\n{}",
        details.name,
        human_join(&mappers),
        details.server,
        mention,
        filename,
        preview_url(stem)
    )
}

/// Everyone who reacted to the message, author first, each user once.
pub async fn reaction_roster(
    platform: &dyn ChatPlatform,
    message: MessageRef,
    author: UserId,
) -> PlatformResult<Vec<UserId>> {
    let mut users = vec![author];

    for reaction in platform.reactions(message).await? {
        for user in platform.reaction_users(message, &reaction).await? {
            if !users.contains(&user) {
                users.push(user);
            }
        }
    }

    Ok(users)
}

/// Lets every user in `users` see the channel, on top of the category's overwrites.
///
/// A user that already has an overwrite in the category keeps it, with the granted
/// permissions allowed and no longer denied.
pub fn review_overwrites(
    users: &[UserId],
    category: Vec<PermissionOverwrite>,
) -> Vec<PermissionOverwrite> {
    let granted = Permissions::VIEW_CHANNEL;
    let mut overwrites = category;

    for &user in users {
        let kind = PermissionOverwriteType::Member(user);

        match overwrites.iter_mut().find(|overwrite| overwrite.kind == kind) {
            Some(overwrite) => {
                overwrite.allow |= granted;
                overwrite.deny &= !granted;
            }
            None => overwrites.push(PermissionOverwrite {
                allow: granted,
                deny: Permissions::empty(),
                kind,
            }),
        }
    }

    overwrites
}

impl InitialSubmission {
    /// Opens a review channel for the map and reposts it there.
    ///
    /// Returns the submission of the reposted file. Errors from the platform are not
    /// handled here.
    #[tracing::instrument(skip_all, fields(message = %self.submission().message().id))]
    pub async fn process(
        self,
        platform: &dyn ChatPlatform,
        renderer: &ThumbnailRenderer,
    ) -> Result<Submission, ProcessError> {
        let submission = self.submission();
        let details = self.details().ok_or(ProcessError::NotValidated)?;
        let category = submission
            .channel()
            .category
            .ok_or(ProcessError::NoCategory)?;
        let origin = submission.message();
        let mention = submission.author().mention().to_string();

        let users = reaction_roster(platform, origin, submission.author()).await?;
        let overwrites = review_overwrites(
            &users,
            platform.permission_overwrites(category).await?,
        );

        let topic = channel_topic(&details, &mention, submission.filename(), submission.stem());
        let channel = platform
            .create_text_channel(NewTextChannel {
                guild: origin.guild,
                category,
                name: channel_name(&details),
                topic: topic.clone(),
                overwrites,
            })
            .await?;
        info!(
            "Created review channel {channel} for map {:?} with {} users",
            submission.filename(),
            users.len()
        );

        let content = submission.content(platform).await?;
        let file = FileUpload {
            filename: submission.filename().to_owned(),
            data: content.clone(),
        };
        let posted = platform
            .send_message(origin.guild, channel, mention, Some(file))
            .await?;
        let attachment = posted.attachment.ok_or(ProcessError::MissingAttachment)?;

        let thumbnail = renderer
            .render(submission.filename(), origin.id, &content)
            .await
            .map(|data| FileUpload {
                filename: format!("{}.png", submission.stem()),
                data,
            });
        platform
            .send_message(origin.guild, channel, preview_url(submission.stem()), thumbnail)
            .await?;

        Ok(Submission::with_content(
            posted.message,
            submission.author(),
            SourceChannel {
                id: channel,
                category: Some(category),
                topic: Some(topic),
            },
            attachment,
            content,
        ))
    }
}
