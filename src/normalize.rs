//! Store URL normalization for pasted lists, uploaded files and CLI input.
//!
//! Duplicates are kept: every occurrence is probed and reported on its own.

/// Normalize one raw entry.
///
/// Returns `None` for blank entries and `#` comments. Entries that do not
/// start with `http` get an `https://` prefix; trailing slashes are removed.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let mut url = if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let kept = url.trim_end_matches('/').len();
    url.truncate(kept);
    Some(url)
}

/// Split text on newlines and commas, normalizing every piece in order.
pub fn normalize_and_split(raw_text: &str) -> Vec<String> {
    raw_text
        .split(['\n', ','])
        .filter_map(normalize_url)
        .collect()
}

/// Normalize pre-split entries (CLI arguments, JSON arrays).
pub fn normalize_all<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|entry| normalize_url(entry.as_ref()))
        .collect()
}
