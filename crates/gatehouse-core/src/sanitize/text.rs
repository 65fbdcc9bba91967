//! Free-text sanitization.

/// Strip control and null bytes from `s` and truncate to `max_len` characters.
///
/// Newlines and tabs survive — they are legitimate in free text. Everything
/// else below U+0020, plus DEL, is dropped. Truncation counts characters, not
/// bytes, so the result is always valid UTF-8.
pub fn sanitize_text(s: &str, max_len: usize) -> String {
    s.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .take(max_len)
        .collect()
}
