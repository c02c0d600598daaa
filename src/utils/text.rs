use lazy_regex::regex;

/// Replaces everything that can't appear in a map file name with `_`.
pub fn sanitize(text: &str) -> String {
    regex!(r"[^A-Za-z0-9_\-]")
        .replace_all(text, "_")
        .into_owned()
}

/// Upper-cases the first character and lower-cases the rest, e.g. `nOVICE` -> `Novice`.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Joins items the way people write lists: `a`, `a and b`, `a, b and c`.
pub fn human_join(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [single] => single.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
