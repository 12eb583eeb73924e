//! Filesystem-safe names for folders and downloaded files.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters Windows refuses in file names
static RESERVED_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]"#).unwrap());

/// Runs of reserved characters and/or whitespace
static RESERVED_OR_SPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|\s]+"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Each reserved character becomes `_`; whitespace is kept.
    Lenient,
    /// Each run of reserved characters or whitespace becomes one `_`; outer `_` trimmed.
    Strict,
}

/// Map a display string to a name usable as a file or directory name.
///
/// Collisions are the caller's problem: distinct inputs may map to the same name.
pub fn sanitize_filename(name: &str, mode: SanitizeMode) -> String {
    match mode {
        SanitizeMode::Lenient => RESERVED_CHAR.replace_all(name, "_").into_owned(),
        SanitizeMode::Strict => RESERVED_OR_SPACE_RUN
            .replace_all(name, "_")
            .trim_matches('_')
            .to_string(),
    }
}
