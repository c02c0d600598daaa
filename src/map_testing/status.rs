use tracing::debug;

use crate::{
    models::{MessageRef, SubmissionState},
    platform::{ChatPlatform, PlatformResult},
};

/// Replaces whatever reactions the message has with the marker for `state`.
///
/// Clearing is skipped for messages without reactions to save a rate-limited request.
#[tracing::instrument(skip(platform))]
pub async fn set_status(
    platform: &dyn ChatPlatform,
    message: MessageRef,
    state: SubmissionState,
) -> PlatformResult<()> {
    if !platform.reactions(message).await?.is_empty() {
        debug!("Clearing reactions of message {}", message.id);
        platform.clear_reactions(message).await?;
    }

    platform.add_reaction(message, &state.reaction()).await
}
