// src/progress.rs
// Strip CLI progress-spinner noise from captured output

use regex::Regex;
use std::sync::LazyLock;

/// One or more trailing spinner frames (`...`, `o..`, `.o.`, `..o`), each
/// drawn then erased with three backspaces
static RE_TRAILING_FRAMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[.o]{3}\x08{3})+$").expect("valid regex"));

/// Remove trailing progress frames from `input`.
///
/// Only whole three-wide frames at the very end are removed. Everything else,
/// including a stray backspace after real text, is left alone.
pub fn strip_progress(input: &str) -> String {
    RE_TRAILING_FRAMES.replace(input, "").into_owned()
}
