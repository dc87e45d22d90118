//! Inbound text clean-up before it reaches the completion backend.
//!
//! A question that does not end in punctuation gets a trailing `？`,
//! otherwise the model tends to continue the user's sentence instead of
//! answering it.

/// Maximum characters (not bytes) forwarded for a single message.
pub const MAX_INPUT_CHARS: usize = 2048;

/// Characters that already terminate a sentence.
pub const TERMINAL_PUNCTUATION: &str = ",.;!?，。！？、…";

/// Appended when the text ends without terminal punctuation.
pub const QUESTION_MARK: char = '？';

/// Clean `raw` for the completion backend.
///
/// - every occurrence of `self_mention` (e.g. `"@RelayBot"`) is removed
/// - leading and trailing whitespace and newlines are trimmed
/// - `None` is returned when nothing is left
/// - the text is cut to [`MAX_INPUT_CHARS`] characters
/// - [`QUESTION_MARK`] is appended unless the text already ends in
///   [`TERMINAL_PUNCTUATION`]; the cut leaves room for it so the result
///   never exceeds [`MAX_INPUT_CHARS`]
pub fn normalize(raw: &str, self_mention: Option<&str>) -> Option<String> {
    let stripped = match self_mention {
        Some(mention) if !mention.is_empty() => raw.replace(mention, ""),
        _ => raw.to_string(),
    };

    let text = stripped.trim();
    if text.is_empty() {
        return None;
    }

    let text = truncate_chars(text, MAX_INPUT_CHARS);
    if ends_with_terminal(text) {
        return Some(text.to_string());
    }

    let mut out = truncate_chars(text, MAX_INPUT_CHARS - 1).to_string();
    out.push(QUESTION_MARK);
    Some(out)
}

/// Return the longest prefix of `s` holding at most `max_chars` characters.
///
/// Cuts on character boundaries so multi-byte sequences are never split.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

fn ends_with_terminal(text: &str) -> bool {
    text.chars()
        .next_back()
        .is_some_and(|c| TERMINAL_PUNCTUATION.contains(c))
}
