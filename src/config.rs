use std::{num::NonZeroU64, path::PathBuf};

use poise::serenity_prelude::ChannelId;
use serde::Deserialize;

use crate::map_testing::thumbnail::DEFAULT_WIDTH;

const DEFAULT_MAP_TESTING_DIR: &str = "data/map-testing";

/// Settings read from the environment (and `.env`), one variable per field.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub discord_bot_token: String,
    submissions_channel: NonZeroU64,
    testing_category: NonZeroU64,
    map_testing_dir: Option<String>,
    render_command: Option<String>,
    thumbnail_width: Option<u32>,
}

impl AppConfig {
    pub fn from_env() -> Result<AppConfig, envy::Error> {
        envy::from_env::<AppConfig>()
    }

    pub fn submissions_channel(&self) -> ChannelId {
        ChannelId::new(self.submissions_channel.get())
    }

    pub fn testing_category(&self) -> ChannelId {
        ChannelId::new(self.testing_category.get())
    }

    pub fn map_testing_dir(&self) -> PathBuf {
        PathBuf::from(
            self.map_testing_dir
                .as_deref()
                .unwrap_or(DEFAULT_MAP_TESTING_DIR),
        )
    }

    /// Where maps are written for the renderer.
    pub fn scratch_dir(&self) -> PathBuf {
        self.map_testing_dir().join("tmp")
    }

    /// The program to run plus the arguments to put before the map path.
    pub fn render_command(&self) -> (PathBuf, Vec<String>) {
        let mut words = self
            .render_command
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_owned);

        match words.next() {
            Some(program) => (PathBuf::from(program), words.collect()),
            None => (self.map_testing_dir().join("render_map"), Vec::new()),
        }
    }

    pub fn thumbnail_width(&self) -> u32 {
        self.thumbnail_width.unwrap_or(DEFAULT_WIDTH)
    }
}
