//! Shared text helpers.

/// Truncate text to a maximum byte length (UTF-8 safe).
///
/// Finds a valid char boundary at or before `max_bytes` so the slice
/// never splits a multi-byte character.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Count whitespace-separated words in a text.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
