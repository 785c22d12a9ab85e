const TRUNCATED_MARKER: &str = "\n…[truncated]";
pub const MAX_PREVIEW_CHARS: usize = 4_000;

/// Shortens generated text for on-screen display; the full text is saved separately.
///
/// Cuts at the last line break inside the limit when there is one, so a preview
/// never ends mid-sentence unless a single line exceeds the limit.
pub fn prepare_preview(text: &str) -> String {
    let text = text.trim_end();
    if text.chars().count() <= MAX_PREVIEW_CHARS {
        return text.to_string();
    }
    let end = text
        .char_indices()
        .nth(MAX_PREVIEW_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let head = &text[..end];
    let head = match head.rfind('\n') {
        Some(idx) if idx > 0 => &head[..idx],
        _ => head,
    };
    format!("{}{TRUNCATED_MARKER}", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::{prepare_preview, MAX_PREVIEW_CHARS, TRUNCATED_MARKER};

    #[test]
    fn short_text_kept_as_is() {
        assert_eq!(prepare_preview("short preview\n\n"), "short preview");
    }

    #[test]
    fn long_single_line_is_cut_at_char_limit() {
        let text = "é".repeat(MAX_PREVIEW_CHARS + 10);
        let preview = prepare_preview(&text);
        assert!(preview.ends_with(TRUNCATED_MARKER));
        let body = preview.strip_suffix(TRUNCATED_MARKER).unwrap();
        assert_eq!(body.chars().count(), MAX_PREVIEW_CHARS);
    }

    #[test]
    fn long_text_is_cut_at_line_break() {
        let line = format!("{}\n", "a".repeat(99));
        let text = line.repeat(MAX_PREVIEW_CHARS / 100 + 5);
        let preview = prepare_preview(&text);
        let body = preview.strip_suffix(TRUNCATED_MARKER).unwrap();
        assert!(body.lines().all(|l| l.len() == 99));
    }
}
