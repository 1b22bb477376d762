//! Text cleanup shared by every extractor.
//!
//! [`Normalizer`] collapses whitespace and strips control characters. PDF
//! output additionally goes through [`Normalizer::normalize_pdf`], which drops
//! low-level syntax tokens the heuristics let through. [`truncate`] enforces
//! the stored-text cap.

mod decode;

pub use decode::decode_plain_text;

use anyhow::{Context, Result};
use regex::Regex;

/// Appended to text cut at the character cap
pub const TRUNCATION_NOTICE: &str =
    "\n\n[Content truncated: document exceeds the maximum extractable length]";

/// Whitespace and artifact cleanup with pre-compiled patterns.
pub struct Normalizer {
    line_endings: Regex,
    horizontal_space: Regex,
    space_around_newline: Regex,
    blank_line_runs: Regex,
    object_blocks: Regex,
    indirect_refs: Regex,
    name_tokens: Regex,
}

impl Normalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            line_endings: Regex::new(r"\r\n?").context("line ending pattern")?,
            horizontal_space: Regex::new(r"[^\S\n]+").context("horizontal space pattern")?,
            space_around_newline: Regex::new(r" ?\n ?").context("newline padding pattern")?,
            blank_line_runs: Regex::new(r"\n{4,}").context("blank line pattern")?,
            object_blocks: Regex::new(r"(?s)\b\d+\s+\d+\s+obj\b.*?\bendobj\b")
                .context("object block pattern")?,
            indirect_refs: Regex::new(r"\b\d+\s+\d+\s+R\b").context("reference pattern")?,
            name_tokens: Regex::new(r"(^|\s)(?:/[A-Za-z][A-Za-z0-9_.+\-]*)+")
                .context("name token pattern")?,
        })
    }

    /// Clean text from any source.
    ///
    /// CR/LF sequences become `\n`, ASCII control characters other than
    /// newline and tab are removed, horizontal whitespace runs become one
    /// space, three or more consecutive blank lines become one, and the
    /// edges are trimmed.
    pub fn normalize(&self, text: &str) -> String {
        let text = self.line_endings.replace_all(text, "\n");
        let text = strip_control_chars(&text);
        self.collapse_whitespace(&text)
    }

    /// Clean text recovered from raw PDF bytes.
    ///
    /// Same as [`normalize`](Self::normalize), but `N G obj ... endobj`
    /// blocks, `N G R` references and `/Name` tokens are removed first.
    pub fn normalize_pdf(&self, text: &str) -> String {
        let text = self.line_endings.replace_all(text, "\n");
        let text = strip_control_chars(&text);
        let text = self.object_blocks.replace_all(&text, " ");
        let text = self.indirect_refs.replace_all(&text, " ");
        let text = self.name_tokens.replace_all(&text, "${1}");
        self.collapse_whitespace(&text)
    }

    fn collapse_whitespace(&self, text: &str) -> String {
        let text = self.horizontal_space.replace_all(text, " ");
        let text = self.space_around_newline.replace_all(&text, "\n");
        let text = self.blank_line_runs.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}

fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Cut `text` to `max_chars` characters and append [`TRUNCATION_NOTICE`].
///
/// Returns the text unchanged when it is within the cap. The second value
/// reports whether a cut happened.
pub fn truncate(mut text: String, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            text.truncate(byte_idx);
            text.push_str(TRUNCATION_NOTICE);
            (text, true)
        }
        None => (text, false),
    }
}
