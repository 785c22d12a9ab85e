#![deny(missing_docs)]
//! Shared logging utilities for the studio workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a minimal test initializer for the global logger, and the redaction helper
//! every logged request URL goes through.

/// Query parameter names whose values are masked by [`redact_secrets`].
const SECRET_PARAMS: &[&str] = &["key", "access_token", "id_token"];

/// Placeholder written in place of a masked value.
pub const REDACTED: &str = "***";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Masks the values of credential-bearing query parameters in `text`.
///
/// Works on full URLs as well as on error messages that embed one, so it can
/// be applied to anything that is about to be logged.
pub fn redact_secrets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((idx, name_len)) = find_secret_param(rest) {
        let value_start = idx + name_len + 1;
        out.push_str(&rest[..value_start]);
        out.push_str(REDACTED);
        let tail = &rest[value_start..];
        let value_len = tail
            .find(|c: char| c == '&' || c == '#' || c.is_whitespace() || c == '"' || c == '\'')
            .unwrap_or(tail.len());
        rest = &tail[value_len..];
    }
    out.push_str(rest);
    out
}

fn find_secret_param(text: &str) -> Option<(usize, usize)> {
    SECRET_PARAMS
        .iter()
        .filter_map(|name| {
            let mut search_from = 0;
            while let Some(pos) = text[search_from..].find(name) {
                let start = search_from + pos;
                let end = start + name.len();
                let preceded = start > 0 && matches!(text.as_bytes()[start - 1], b'?' | b'&');
                let followed = text.as_bytes().get(end) == Some(&b'=');
                if preceded && followed {
                    return Some((start, name.len()));
                }
                search_from = end;
            }
            None
        })
        .min_by_key(|(start, _)| *start)
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
