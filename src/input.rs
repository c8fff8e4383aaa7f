//! Canonicalizes stored test-case input into the byte stream fed to a
//! child process's stdin.

/// Normalize raw test-case input text.
///
/// Test data is sometimes stored with escaped rather than literal
/// newlines, Windows line endings, or stray per-line whitespace. This
/// unescapes `\r\n`, `\n` and `\t` pairs, folds CRLF to LF, trims each
/// line, drops blank lines, and guarantees exactly one trailing newline
/// so line-buffered readers see their last line.
///
/// Pure and idempotent: normalizing normalized text is a no-op.
pub fn normalize_input(raw: &str) -> String {
    let unescaped = raw
        .replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\r\n", "\n");

    let mut text = unescaped
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    text.push('\n');
    text
}

/// Trim-only comparison used to judge a case: leading/trailing
/// whitespace is ignored, internal whitespace is significant.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}
