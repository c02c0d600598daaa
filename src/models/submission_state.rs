use poise::serenity_prelude::ReactionType;

/// Pipeline stage of a submission, shown as a single reaction on its message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    Validated,
    Uploaded,
    Processed,
    Error,
}

impl SubmissionState {
    pub fn emoji(&self) -> &'static str {
        use SubmissionState::*;

        match self {
            Validated => "☑",
            Uploaded => "🆙",
            Processed => "✅",
            Error => "❌",
        }
    }

    pub fn reaction(&self) -> ReactionType {
        ReactionType::Unicode(self.emoji().to_owned())
    }
}
