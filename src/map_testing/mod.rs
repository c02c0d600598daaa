pub mod bypass;
pub mod provisioning;
pub mod status;
pub mod thumbnail;
pub mod validation;

use std::sync::Arc;

use indoc::formatdoc;
use poise::serenity_prelude::ChannelId;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::{
    models::{InitialSubmission, MessageRef, SourceChannel, SubmissionState},
    platform::{ChatPlatform, FileUpload, PlatformError},
};

use provisioning::preview_url;
use thumbnail::ThumbnailRenderer;

pub use validation::SubmissionError;

#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("The submission has not been validated")]
    NotValidated,
    #[error("The submission channel is not in a category")]
    NoCategory,
    #[error("The reposted map message has no attachment")]
    MissingAttachment,
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// A new map in the submissions channel.
    Initial,
    /// A file posted into one of the review channels.
    Resubmission,
    Ignored,
}

/// Takes map submissions from the chat to their review channels.
pub struct MapTesting {
    platform: Arc<dyn ChatPlatform>,
    renderer: Arc<ThumbnailRenderer>,
    submissions_channel: ChannelId,
    testing_category: ChannelId,
}

impl MapTesting {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        renderer: Arc<ThumbnailRenderer>,
        submissions_channel: ChannelId,
        testing_category: ChannelId,
    ) -> MapTesting {
        MapTesting {
            platform,
            renderer,
            submissions_channel,
            testing_category,
        }
    }

    pub fn route(&self, channel: &SourceChannel) -> Route {
        if channel.id == self.submissions_channel {
            Route::Initial
        } else if channel.category == Some(self.testing_category) {
            Route::Resubmission
        } else {
            Route::Ignored
        }
    }

    /// Runs the submission on its own task. Failures end up in the log.
    pub fn spawn(self: &Arc<Self>, submission: InitialSubmission) {
        let span = info_span!(
            "submission",
            message = %submission.submission().message().id,
            filename = submission.submission().filename(),
        );
        let map_testing = self.clone();

        tokio::spawn(
            async move {
                if let Err(err) = map_testing.handle(submission).await {
                    error!("Could not process map submission: {err}");
                }
            }
            .instrument(span),
        );
    }

    pub async fn handle(&self, submission: InitialSubmission) -> Result<(), ProcessError> {
        match self.route(submission.submission().channel()) {
            Route::Initial => self.handle_initial(submission).await,
            Route::Resubmission => self.handle_resubmission(submission).await,
            Route::Ignored => Ok(()),
        }
    }

    async fn handle_initial(&self, mut submission: InitialSubmission) -> Result<(), ProcessError> {
        let platform = self.platform.as_ref();
        let origin = submission.submission().message();

        if let Err(err) = submission.validate() {
            info!("Rejected map submission: {err}");
            mark_failed(platform, origin).await;
            submission.respond(platform, &err).await;
            return Ok(());
        }
        submission
            .set_status(platform, SubmissionState::Validated)
            .await?;

        match submission.process(platform, &self.renderer).await {
            Ok(processed) => {
                status::set_status(platform, origin, SubmissionState::Processed).await?;
                processed
                    .set_status(platform, SubmissionState::Uploaded)
                    .await?;
                Ok(())
            }
            Err(err) => {
                mark_failed(platform, origin).await;
                Err(err)
            }
        }
    }

    async fn handle_resubmission(&self, submission: InitialSubmission) -> Result<(), ProcessError> {
        if !submission.can_bypass() {
            debug!("Not a resubmission by the map's author, ignoring");
            return Ok(());
        }

        let platform = self.platform.as_ref();
        let origin = submission.submission().message();
        submission
            .set_status(platform, SubmissionState::Validated)
            .await?;

        if let Err(err) = self.post_preview(&submission).await {
            mark_failed(platform, origin).await;
            return Err(err);
        }

        info!("Accepted resubmission of {:?}", submission.submission().filename());
        Ok(())
    }

    /// Posts the preview of a resubmitted map into its review channel.
    async fn post_preview(&self, submission: &InitialSubmission) -> Result<(), ProcessError> {
        let platform = self.platform.as_ref();
        let record = submission.submission();

        let content = submission.content(platform).await?;
        let thumbnail = self
            .renderer
            .render(record.filename(), record.message().id, &content)
            .await
            .map(|data| FileUpload {
                filename: format!("{}.png", record.stem()),
                data,
            });

        let message = record.message();
        platform
            .send_message(
                message.guild,
                message.channel,
                preview_url(record.stem()),
                thumbnail,
            )
            .await?;

        submission
            .set_status(platform, SubmissionState::Uploaded)
            .await?;
        Ok(())
    }
}

async fn mark_failed(platform: &dyn ChatPlatform, message: MessageRef) {
    if let Err(err) = status::set_status(platform, message, SubmissionState::Error).await {
        warn!("Could not mark failed submission {}: {err}", message.id);
    }
}

impl InitialSubmission {
    /// Tells the author what's wrong with their submission. Authors with closed DMs
    /// don't get told.
    pub async fn respond(&self, platform: &dyn ChatPlatform, error: &SubmissionError) {
        let message = formatdoc! {
            r#"
                **{error}**

                Submitted file: `{filename}`.

                The message of a map submission should look like this: `"<map name>" by <mapper(s)> [<server type>]`
            "#,
            filename = self.submission().filename(),
        };

        if let Err(err) = platform
            .send_direct_message(self.submission().author(), message)
            .await
        {
            debug!("Could not send the submission error to the author: {err}");
        }
    }
}
