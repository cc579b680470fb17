// src/sanitize.rs

//! Terminal control sequence stripping for child process output.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Two-character `ESC <final>` sequences and CSI sequences
/// (`ESC [ <params> <intermediates> <final>`).
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("static ANSI regex is valid")
});

/// Remove ANSI/VT escape sequences from `text`.
///
/// Everything that is not part of an escape sequence is kept verbatim.
/// Removal is repeated until nothing matches any more, because dropping one
/// sequence can splice an `ESC` onto the tail of a neighbouring fragment and
/// form a new one. That makes the function idempotent.
///
/// Clean input is returned borrowed.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !ANSI_ESCAPE.is_match(text) {
        return Cow::Borrowed(text);
    }

    let mut current = ANSI_ESCAPE.replace_all(text, "").into_owned();
    while ANSI_ESCAPE.is_match(&current) {
        current = ANSI_ESCAPE.replace_all(&current, "").into_owned();
    }
    Cow::Owned(current)
}
