//! File and directory names derived from message data.

/// Longest name (in characters) written to disk.
const MAX_NAME_LEN: usize = 200;

/// Make a header-supplied name safe to use as a single path component.
///
/// Path separators, `:` and control characters become `_`; the result is
/// trimmed and truncated. Returns `None` for names that are empty or consist
/// only of dots once cleaned.
pub fn sanitize_component(s: &str) -> Option<String> {
    let sanitized: String = s
        .trim()
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == ':' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    let sanitized = sanitized.trim().to_string();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        None
    } else {
        Some(sanitized)
    }
}

/// Name for an attachment part that declares no usable filename.
pub fn unnamed_attachment(seq: usize) -> String {
    format!("attachment-{seq}.bin")
}
