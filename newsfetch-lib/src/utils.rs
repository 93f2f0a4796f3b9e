//! Utility functions shared by the library and the CLI.
//!
//! Duration strings, content truncation and URL list parsing.

use std::time::Duration;

/// Parse a duration string like "500ms", "5s", "2m" into a `Duration`.
///
/// A bare number is taken as seconds.
///
/// # Returns
///
/// The parsed duration, or None if the string is not understood.
pub fn parse_duration_string(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    if let Some(ms) = input.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = input.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = input.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        input.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Truncate `content` to at most `max_chars` characters, appending "..." if cut.
///
/// Cuts on a character boundary, never inside a multi-byte sequence.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}

/// Parse a URL list: one URL per line, blank lines and `#` comments ignored.
///
/// Returns the accepted URLs and a description of every rejected line.
pub fn parse_url_list(content: &str) -> (Vec<String>, Vec<String>) {
    let mut urls = Vec::new();
    let mut invalid = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        // Handle inline comments
        let entry = trimmed.split(" #").next().unwrap_or("").trim();
        if entry.is_empty() {
            continue;
        }

        if entry.starts_with("http://") || entry.starts_with("https://") {
            urls.push(entry.to_string());
        } else {
            invalid.push(format!(
                "Line {}: '{}' - not an http(s) URL",
                idx + 1,
                entry
            ));
        }
    }

    (urls, invalid)
}
