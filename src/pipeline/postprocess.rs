//! Post-processing: deterministic cleanup of converter output.
//!
//! External converters produce Markdown from very different back ends
//! (office XML, PDF text layers, OCR, speech transcription), and each leaves
//! its own residue: Windows line endings from `.docx`, a byte-order mark from
//! `.csv`, zero-width spaces from HTML, long runs of blank lines where a PDF
//! had empty text boxes.
//!
//! Cleanup is opt-in (`clean_output`); by default the converter's text is
//! stored exactly as returned. The rules here only touch line endings,
//! whitespace and formatting marks that carry no meaning. Joiners and soft
//! hyphens are kept: U+200D binds emoji sequences, U+200C shapes Persian and
//! Indic text, U+00AD marks hyphenation points.
//!
//! ## Rule Order
//!
//! Line endings are normalised before trimming so `\r` is not mistaken for
//! content, and invisible characters are stripped before the blank-run pass
//! so a line holding only a zero-width space counts as blank.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw converter output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip zero-width spaces, byte-order marks and word joiners
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Trim leading blank lines and end with exactly one newline
///
/// Output that is blank after cleanup is returned as an empty string so the
/// caller can record it as "no content".
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    finish(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{2060}'],
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

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 5: Trim the ends ────────────────────────────────────────────────────

fn finish(input: &str) -> String {
    let trimmed = input.trim_start_matches('\n').trim_end();
    if trimmed.trim().is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
