use sha2::{Digest, Sha256};

const MAX_STEM_LEN: usize = 60;

/// Filesystem-safe, deterministic artifact filename: `{sanitized_hint}--{short_hash(source)}.{ext}`.
///
/// The hint is usually the prompt that produced the artifact; the hash is taken
/// over the artifact itself so two different results of one prompt never collide.
pub fn artifact_filename(hint: Option<&str>, source: &[u8], extension: &str) -> String {
    let stem = sanitize_hint(hint.unwrap_or("artifact"));
    let hash = short_hash(source);
    let extension = extension.trim_start_matches('.');
    format!("{stem}--{hash}.{extension}")
}

fn sanitize_hint(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_sep = false;
    for c in input.chars() {
        if is_forbidden(c) || c.is_whitespace() {
            if !prev_sep {
                compacted.push('_');
            }
            prev_sep = true;
        } else {
            compacted.push(c);
            prev_sep = false;
        }
    }
    let mut stem: String = compacted
        .trim_matches(&['_', '.'][..])
        .chars()
        .take(MAX_STEM_LEN)
        .collect();
    stem = stem.trim_end_matches(&['_', '.'][..]).to_string();
    if stem.is_empty() {
        stem = "artifact".to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &[u8]) -> String {
    let digest = Sha256::digest(input);
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::artifact_filename;

    #[test]
    fn whitespace_and_forbidden_chars_collapse() {
        let name = artifact_filename(Some("A cat: in  space?"), b"bytes", "jpg");
        assert!(name.starts_with("A_cat_in_space--"), "{name}");
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn same_content_same_name() {
        let a = artifact_filename(Some("x"), b"one", ".png");
        let b = artifact_filename(Some("x"), b"one", "png");
        let c = artifact_filename(Some("x"), b"two", "png");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn long_and_reserved_hints_are_patched() {
        let long = "word ".repeat(40);
        let name = artifact_filename(Some(&long), b"z", "mp4");
        let stem = name.split("--").next().unwrap();
        assert!(stem.chars().count() <= 60);

        assert!(artifact_filename(Some("nul"), b"z", "wav").starts_with("nul_--"));
        assert!(artifact_filename(Some("???"), b"z", "wav").starts_with("artifact--"));
    }
}
