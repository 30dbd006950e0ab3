//! Post-processing: deterministic cleanup of locally recognised text.
//!
//! Vision models served by Ollama ignore parts of their prompt now and then.
//! Typical artefacts:
//!
//! - Wrapping the whole answer in a ` ``` ` fence
//! - Emitting a `<think>…</think>` reasoning block before the answer
//!   (qwen3-family models do this unless told `/no_think`)
//! - Windows-style `\r\n` line endings
//! - Zero-width characters copied from the source image's text layer
//!
//! Tesseract reads what is printed on the page, so its output only gets the
//! layout rules ([`clean_ocr_text`]): a literal `<think>` or fence in a scan
//! is content.
//!
//! ## Rule Order
//!
//! Reasoning blocks are removed before fence stripping so a fence that
//! follows a think block is recognised as the outer fence.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw engine output.
///
/// Rules (applied in order):
/// 1. Remove `<think>…</think>` reasoning blocks
/// 2. Strip an outer code fence
/// 3. Normalise line endings (CRLF → LF)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive blank lines down to 2
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Trim leading and trailing blank space
pub fn clean_recognized_text(input: &str) -> String {
    let s = remove_think_blocks(input);
    let s = strip_outer_fences(&s);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

/// Layout-only cleanup for OCR engine output.
///
/// Applies rules 3–7 of [`clean_recognized_text`]; the printed text itself is
/// left as recognised.
pub fn clean_ocr_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Remove reasoning blocks ──────────────────────────────────────────

static RE_THINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?(?:</think>|\z)").expect("valid regex"));

fn remove_think_blocks(input: &str) -> String {
    RE_THINK.replace_all(input, "").to_string()
}

// ── Rule 2: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\r?\n(.*?)\r?\n```\s*$").expect("valid regex"));

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 3: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 6: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────
