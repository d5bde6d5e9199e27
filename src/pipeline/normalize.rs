//! Text normalisation applied to every block before classification.
//!
//! PDF text objects carry artefacts that would otherwise leak into the
//! Markdown or confuse the pattern rules: Windows line endings from the
//! producer, trailing blanks on every line, and invisible code points
//! (soft hyphens at line breaks, zero-width spaces used for kerning, BOMs).
//!
//! Each rule is a pure `&str → String` pass; [`normalize_block_text`] runs
//! them in order and trims the result.

/// Apply all normalisation rules, then trim the block.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF/CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, …)
/// 3. Trim trailing whitespace per line
///
/// Internal line breaks are kept; callers rely on them for list items and
/// multi-line formulas.
pub fn normalize_block_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}
