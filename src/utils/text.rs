use std::borrow::Cow;

/// Shortens `text` to at most `max_chars` characters, appending "..." when
/// something was cut. Used to keep user content in logs short.
pub fn ellipsize(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &text[..idx])),
        None => Cow::Borrowed(text),
    }
}
