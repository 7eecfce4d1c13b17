//! Text helpers for prompt building.

/// First `max_chars` characters of `text`.
///
/// Counts Unicode scalar values, not bytes, so a budget of 600 keeps 600
/// characters of accented or CJK advisor text as well as ASCII.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
