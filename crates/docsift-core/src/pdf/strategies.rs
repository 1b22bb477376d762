//! Independent text-recovery strategies over raw PDF bytes.
//!
//! Each strategy sees the same byte window and returns the fragments it
//! recognises. None of them understands the object graph or decompresses
//! streams; together they cover the encodings most producers emit for
//! uncompressed content.

use anyhow::{Context, Result};
use regex::bytes::Regex;

use super::literal::{printable_ascii, LiteralStrings};

/// A recovery strategy: bytes in, text fragments out.
pub trait RecoveryStrategy: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Recover text fragments from `pdf`, in byte order.
    fn recover(&self, pdf: &[u8]) -> Vec<String>;
}

fn has_ascii_letter(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_alphabetic())
}

/// Parenthesised literal strings anywhere in the file.
pub struct LiteralStringStrategy;

impl RecoveryStrategy for LiteralStringStrategy {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn recover(&self, pdf: &[u8]) -> Vec<String> {
        LiteralStrings::new(pdf)
            .map(|raw| printable_ascii(&raw))
            .filter(|s| s.len() > 1 && has_ascii_letter(s))
            .collect()
    }
}

/// `<...>` hex strings holding 16-bit big-endian code units.
pub struct HexStringStrategy {
    pattern: Regex,
    max_matches: usize,
}

impl HexStringStrategy {
    pub fn new(max_matches: usize) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"(?-u)<([0-9A-Fa-f]{8,})>").context("hex string pattern")?,
            max_matches,
        })
    }
}

/// Decode hex digits four at a time as UTF-16BE code units, keeping printable
/// ASCII plus alphanumerics from the rest of the BMP. A trailing partial group
/// is ignored.
pub fn decode_hex_units(hex: &[u8]) -> String {
    hex.chunks_exact(4)
        .filter_map(|group| {
            let digits = std::str::from_utf8(group).ok()?;
            let unit = u32::from_str_radix(digits, 16).ok()?;
            char::from_u32(unit)
        })
        .filter(|c| (' '..='~').contains(c) || c.is_alphanumeric())
        .collect()
}

impl RecoveryStrategy for HexStringStrategy {
    fn name(&self) -> &'static str {
        "hex"
    }

    fn recover(&self, pdf: &[u8]) -> Vec<String> {
        self.pattern
            .captures_iter(pdf)
            .take(self.max_matches)
            .filter_map(|caps| caps.get(1))
            .map(|m| decode_hex_units(m.as_bytes()))
            .filter(|s| s.chars().filter(|c| c.is_alphabetic()).count() >= 2)
            .collect()
    }
}

/// `(...) Tj` operands inside `BT ... ET` text objects.
pub struct ShowTextStrategy {
    show_text: Regex,
    max_object_len: usize,
}

impl ShowTextStrategy {
    pub fn new(max_object_len: usize, max_operand_len: usize) -> Result<Self> {
        let pattern = format!(r"(?-u)\(([^)]{{1,{}}})\)\s*Tj", max_operand_len.max(1));
        Ok(Self {
            show_text: Regex::new(&pattern).context("show-text pattern")?,
            max_object_len,
        })
    }
}

impl RecoveryStrategy for ShowTextStrategy {
    fn name(&self) -> &'static str {
        "show_text"
    }

    fn recover(&self, pdf: &[u8]) -> Vec<String> {
        let mut fragments = Vec::new();
        for body in text_objects(pdf, self.max_object_len) {
            for caps in self.show_text.captures_iter(body) {
                if let Some(operand) = caps.get(1) {
                    let clean = printable_ascii(operand.as_bytes());
                    if has_ascii_letter(&clean) {
                        fragments.push(clean);
                    }
                }
            }
        }
        fragments
    }
}

/// Bodies of `BT ... ET` blocks: the nearest `ET` at least one byte and at
/// most `max_len` bytes after each `BT`.
pub fn text_objects(pdf: &[u8], max_len: usize) -> Vec<&[u8]> {
    let mut bodies = Vec::new();
    let mut pos = 0;

    while let Some(offset) = find(&pdf[pos..], b"BT") {
        let bt = pos + offset;
        let body_start = bt + 2;
        // ET may begin anywhere in body_start+1 ..= body_start+max_len
        let search_from = (body_start + 1).min(pdf.len());
        let search_to = (body_start + max_len + 2).min(pdf.len());

        match find(&pdf[search_from..search_to], b"ET") {
            Some(et) => {
                let body_end = search_from + et;
                bodies.push(&pdf[body_start..body_end]);
                pos = body_end + 2;
            }
            None => pos = bt + 1,
        }
    }

    bodies
}

/// Runs of three or more alphabetic words, each 3 to 15 letters.
pub struct WordSequenceStrategy {
    pattern: Regex,
    max_matches: usize,
}

impl WordSequenceStrategy {
    pub fn new(max_matches: usize) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"(?-u)\b[A-Za-z][a-z]{2,14}(?:\s+[A-Za-z][a-z]{2,14}){2,}\b")
                .context("word sequence pattern")?,
            max_matches,
        })
    }
}

impl RecoveryStrategy for WordSequenceStrategy {
    fn name(&self) -> &'static str {
        "word_sequence"
    }

    fn recover(&self, pdf: &[u8]) -> Vec<String> {
        self.pattern
            .find_iter(pdf)
            .take(self.max_matches)
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
            .collect()
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
