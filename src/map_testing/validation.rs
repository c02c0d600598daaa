use std::str::FromStr;

use lazy_regex::{regex, regex_captures};

use crate::{
    models::{InitialSubmission, MapCategory},
    utils::text::{capitalize, sanitize},
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Your map submission doesn't contain correctly formatted details")]
    Format,
    #[error("Name and filename of your map submission don't match")]
    NameMismatch,
    #[error("The server type of your map submission is not valid")]
    UnknownCategory,
}

struct Caption<'a> {
    name: &'a str,
    mappers: &'a str,
    server: &'a str,
}

fn parse_caption(caption: &str) -> Option<Caption<'_>> {
    let (_whole, name, mappers, server) =
        regex_captures!(r#"^"(.+)" +by +(.+) +\[(.+)\]$"#, caption)?;

    Some(Caption {
        name,
        mappers,
        server,
    })
}

pub fn split_mappers(mappers: &str) -> Vec<String> {
    regex!(r", | , | & | and ")
        .split(mappers)
        .map(str::trim)
        .filter(|mapper| !mapper.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn parse_category(server: &str) -> Option<MapCategory> {
    MapCategory::from_str(&capitalize(server)).ok()
}

impl InitialSubmission {
    /// Checks the caption against `"<name>" by <mappers> [<server>]` and the file name.
    ///
    /// Fields are filled in as they are checked, so a submission with a bad server
    /// still ends up with its name and mappers set.
    pub fn validate(&mut self) -> Result<(), SubmissionError> {
        let caption = parse_caption(self.caption()).ok_or(SubmissionError::Format)?;

        let name = caption.name.to_owned();
        let mappers = split_mappers(caption.mappers);
        let server = parse_category(caption.server);

        let name_matches = sanitize(&name) == self.submission().stem();
        self.name = Some(name);
        if !name_matches {
            return Err(SubmissionError::NameMismatch);
        }

        if mappers.is_empty() {
            return Err(SubmissionError::Format);
        }
        self.mappers = Some(mappers);

        self.server = Some(server.ok_or(SubmissionError::UnknownCategory)?);

        Ok(())
    }
}
