use bytes::Bytes;
use poise::serenity_prelude::{AttachmentId, ChannelId, GuildId, Mentionable, MessageId, UserId};
use tokio::sync::OnceCell;

use crate::{
    map_testing::{bypass, status},
    models::{MapCategory, SubmissionState},
    platform::{ChatPlatform, PlatformResult},
};

pub const MAP_EXTENSION: &str = ".map";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub id: MessageId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentRef {
    pub id: AttachmentId,
    pub filename: String,
}

/// The channel a submission was posted in, as it was when the message arrived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceChannel {
    pub id: ChannelId,
    pub category: Option<ChannelId>,
    pub topic: Option<String>,
}

/// A map file attached to a message.
///
/// The file is downloaded the first time someone asks for it and kept for as long as
/// the submission lives.
#[derive(Debug)]
pub struct Submission {
    message: MessageRef,
    author: UserId,
    channel: SourceChannel,
    attachment: AttachmentRef,
    content: OnceCell<Bytes>,
}

impl Submission {
    pub fn new(
        message: MessageRef,
        author: UserId,
        channel: SourceChannel,
        attachment: AttachmentRef,
    ) -> Submission {
        Submission {
            message,
            author,
            channel,
            attachment,
            content: OnceCell::new(),
        }
    }

    /// A submission whose file is already known, e.g. after it's been reposted.
    pub fn with_content(
        message: MessageRef,
        author: UserId,
        channel: SourceChannel,
        attachment: AttachmentRef,
        content: Bytes,
    ) -> Submission {
        Submission {
            message,
            author,
            channel,
            attachment,
            content: OnceCell::from(content),
        }
    }

    pub fn message(&self) -> MessageRef {
        self.message
    }

    pub fn author(&self) -> UserId {
        self.author
    }

    pub fn channel(&self) -> &SourceChannel {
        &self.channel
    }

    pub fn filename(&self) -> &str {
        &self.attachment.filename
    }

    /// File name without the `.map` extension.
    pub fn stem(&self) -> &str {
        self.filename()
            .strip_suffix(MAP_EXTENSION)
            .unwrap_or(self.filename())
    }

    pub async fn content(&self, platform: &dyn ChatPlatform) -> PlatformResult<Bytes> {
        self.content
            .get_or_try_init(|| platform.download_attachment(self.message, &self.attachment))
            .await
            .cloned()
    }

    pub async fn set_status(
        &self,
        platform: &dyn ChatPlatform,
        state: SubmissionState,
    ) -> PlatformResult<()> {
        status::set_status(platform, self.message, state).await
    }

    /// Left to whoever decides a map is ready; the submission pipeline never pins.
    #[allow(dead_code)]
    pub async fn pin(&self, platform: &dyn ChatPlatform) -> PlatformResult<()> {
        platform.pin(self.message).await
    }
}

/// A submission that hasn't been accepted yet.
///
/// Its caption is parsed by [`InitialSubmission::validate`], which fills in the map
/// details one at a time. A failed validation may leave some of them set.
#[derive(Debug)]
pub struct InitialSubmission {
    submission: Submission,
    caption: String,
    pub(crate) name: Option<String>,
    pub(crate) mappers: Option<Vec<String>>,
    pub(crate) server: Option<MapCategory>,
}

/// Map details of a submission that passed validation.
#[derive(Clone, Copy, Debug)]
pub struct MapDetails<'a> {
    pub name: &'a str,
    pub mappers: &'a [String],
    pub server: MapCategory,
}

impl InitialSubmission {
    pub fn new(submission: Submission, caption: impl Into<String>) -> InitialSubmission {
        InitialSubmission {
            submission,
            caption: caption.into(),
            name: None,
            mappers: None,
            server: None,
        }
    }

    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn details(&self) -> Option<MapDetails<'_>> {
        Some(MapDetails {
            name: self.name.as_deref()?,
            mappers: self.mappers.as_deref()?,
            server: self.server?,
        })
    }

    /// The same author re-uploading the same file into its review channel doesn't need
    /// to be validated again.
    pub fn can_bypass(&self) -> bool {
        let submission = &self.submission;

        bypass::can_bypass(
            submission.channel().topic.as_deref(),
            &submission.author().mention().to_string(),
            submission.filename(),
        )
    }

    pub async fn content(&self, platform: &dyn ChatPlatform) -> PlatformResult<Bytes> {
        self.submission.content(platform).await
    }

    pub async fn set_status(
        &self,
        platform: &dyn ChatPlatform,
        state: SubmissionState,
    ) -> PlatformResult<()> {
        self.submission.set_status(platform, state).await
    }
}
