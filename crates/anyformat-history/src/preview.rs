use serde_json::Value;

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Characters kept by [`generate_preview`].
const SNIPPET_CHARS: usize = 100;

/// Byte length of `content` once encoded (UTF-8), not its character count.
pub fn estimate_size(content: &str) -> usize {
    content.len()
}

/// Short preview of a document: pretty-printed when it parses as JSON,
/// raw otherwise, cut to 100 characters.
pub fn generate_preview(content: &str) -> String {
    let text = match serde_json::from_str::<Value>(content) {
        Ok(parsed) => serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| content.to_string()),
        Err(_) => content.to_string(),
    };
    truncate_with_ellipsis(&text, SNIPPET_CHARS)
}

/// Keep the first `max_chars` characters, adding [`ELLIPSIS`] if anything was cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len());
            out.push_str(&text[..cut]);
            out.push_str(ELLIPSIS);
            out
        }
        None => text.to_string(),
    }
}
