//! Outbound reply formatting.

/// Sent whenever the backend produced nothing usable.
pub const FALLBACK_REPLY: &str = "将物质欲望降低些，便没那么多烦恼了";

/// Rule between the quoted question and the answer in group replies.
pub const SEPARATOR: &str = " --------------------------------";

/// Drop a leading paragraph the model sometimes emits before the answer.
///
/// When `raw` contains a blank line, everything up to and including the
/// first `"\n\n"` is removed. The remainder is trimmed.
pub fn strip_preamble(raw: &str) -> &str {
    let body = match raw.split_once("\n\n") {
        Some((_, rest)) => rest,
        None => raw,
    };
    body.trim()
}

/// `@<mention>\n<question>\n --------------------------------\n<reply>`.
///
/// An empty reply collapses to `@<mention> <fallback>`.
pub fn format_group_reply(mention_handle: &str, question: &str, raw_reply: &str) -> String {
    let reply = strip_preamble(raw_reply);
    if reply.is_empty() {
        return format!("@{mention_handle} {FALLBACK_REPLY}");
    }
    let out = format!("@{mention_handle}\n{question}\n{SEPARATOR}\n{reply}");
    out.trim_matches('\n').to_string()
}

/// `<prefix>\n<reply>`, with the fallback standing in for an empty reply.
pub fn format_private_reply(prefix: &str, raw_reply: &str) -> String {
    let reply = match strip_preamble(raw_reply) {
        "" => FALLBACK_REPLY,
        r => r,
    };
    format!("{prefix}\n{reply}").trim_matches('\n').to_string()
}
