use strum::{Display, EnumIter, EnumString};

/// The test server a map is submitted for.
///
/// Doubles as the whitelist for the `[Category]` part of a submission caption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum MapCategory {
    Novice,
    Moderate,
    Brutal,
    Insane,
    Dummy,
    Oldschool,
    Solo,
    Race,
}

impl MapCategory {
    /// The emoji prepended to review channel names.
    pub fn glyph(&self) -> &'static str {
        use MapCategory::*;

        match self {
            Novice => "👶",
            Moderate => "🌸",
            Brutal => "💪",
            Insane => "💀",
            Dummy => "♿",
            Oldschool => "👴",
            Solo => "⚡",
            Race => "🏁",
        }
    }
}
