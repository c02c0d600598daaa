/// Checks the `<mentions> | <filename>` line a review channel topic carries on its second
/// line. Anything that doesn't look like that line is simply not a match.
pub fn can_bypass(topic: Option<&str>, author_mention: &str, filename: &str) -> bool {
    let Some(line) = topic.and_then(|topic| topic.split('\n').nth(1)) else {
        return false;
    };

    match line.split(" | ").collect::<Vec<_>>()[..] {
        [mentions, recorded_filename] => {
            mentions.contains(author_mention) && recorded_filename == filename
        }
        _ => false,
    }
}
