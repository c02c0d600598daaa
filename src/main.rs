#![forbid(unsafe_code)]

mod config;
mod event_handler;
mod map_testing;
mod models;
mod platform;
mod poise_error_handler;
mod utils;

use std::{process::exit, sync::Arc};

use anyhow::Context;
use config::AppConfig;
use map_testing::{thumbnail::ThumbnailRenderer, MapTesting};
use platform::{PlatformError, SerenityPlatform};
use poise::{serenity_prelude::*, Framework};
use poise_error_handler::handle_error;
use tokio::{fs, select, signal};
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub struct BotState {
    pub map_testing: Arc<MapTesting>,
}

#[derive(thiserror::Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Serenity(#[from] serenity::Error),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(
                    "map_testing_bot=info"
                        .parse()
                        .expect("Hard-coded default directive should be correct"),
                )
                .from_env_lossy(),
        )
        .init();

    if let Err(err) = dotenv {
        warn!("Could not load config from .env file: {err}");
    }

    let app_config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Could not load app config: {err}");
            exit(255);
        }
    };

    let renderer = match setup_renderer(&app_config).await {
        Ok(renderer) => Arc::new(renderer),
        Err(err) => {
            error!("Could not setup the thumbnail renderer: {err:#}");
            exit(255);
        }
    };

    let submissions_channel = app_config.submissions_channel();
    let testing_category = app_config.testing_category();

    let framework = Framework::builder()
        .options(poise::FrameworkOptions {
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler::handle_event(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(handle_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, _framework| {
            Box::pin(
                async move {
                    info!(
                        "Logged in as {}, taking map submissions from {submissions_channel}",
                        ready.user.name
                    );

                    let platform = Arc::new(SerenityPlatform::new(ctx.http.clone()));
                    let map_testing = Arc::new(MapTesting::new(
                        platform,
                        renderer,
                        submissions_channel,
                        testing_category,
                    ));

                    Ok(BotState { map_testing })
                }
                .instrument(info_span!("bot_setup")),
            )
        })
        .build();

    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let mut client = match ClientBuilder::new(app_config.discord_bot_token, intents)
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to create the client: {err}");
            exit(255);
        }
    };

    select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            client.shard_manager.shutdown_all().await;
        },

        result = client.start() => {
            if let Err(err) = result {
                error!("Failed to start the client: {err}");
            }
        },
    };
}

#[tracing::instrument(skip_all)]
async fn setup_renderer(app_config: &AppConfig) -> anyhow::Result<ThumbnailRenderer> {
    let scratch_dir = app_config.scratch_dir();
    fs::create_dir_all(&scratch_dir)
        .await
        .with_context(|| format!("creating scratch directory {scratch_dir:?}"))?;

    let (program, args) = app_config.render_command();
    info!("Rendering map thumbnails with {program:?} in {scratch_dir:?}");

    Ok(ThumbnailRenderer::new(
        scratch_dir,
        program,
        args,
        app_config.thumbnail_width(),
    ))
}
