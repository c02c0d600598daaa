use poise::{serenity_prelude::FullEvent, FrameworkError};
use tracing::{error, warn};

use crate::{BotError, BotState};

pub async fn handle_error(error: FrameworkError<'_, BotState, BotError>) {
    use FrameworkError::*;

    match error {
        Setup { error, .. } => {
            error!("Error in user data setup: {}", error);
        }

        EventHandler { error, event, .. } => {
            error!("Error in {}: {}", event_context(event), error);
        }

        UnknownInteraction { interaction, .. } => {
            warn!("Received an unknown interaction: {:?}", interaction);
        }

        error => {
            error!("Unknown error: {}", error);
        }
    }
}

/// What the failed event was about, for the log.
fn event_context(event: &FullEvent) -> String {
    match event {
        FullEvent::Message { new_message } => {
            let files = new_message
                .attachments
                .iter()
                .map(|attachment| format!("{:?}", attachment.filename))
                .collect::<Vec<_>>();

            format!(
                "message {} by {} ({}) in channel {} with files [{}]",
                new_message.id,
                new_message.author.name,
                new_message.author.id,
                new_message.channel_id,
                files.join(", ")
            )
        }
        event => format!("{} event handler", event.snake_case_name()),
    }
}
