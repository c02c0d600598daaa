mod map_category;
mod submission;
mod submission_state;

pub use map_category::MapCategory;
pub use submission::{
    AttachmentRef, InitialSubmission, MapDetails, MessageRef, SourceChannel, Submission,
    MAP_EXTENSION,
};
pub use submission_state::SubmissionState;

#[cfg(test)]
pub(crate) use submission::tests as fixtures;
