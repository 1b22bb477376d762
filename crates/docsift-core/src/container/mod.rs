//! Text harvesting from zip-packaged XML documents (word-processor files and
//! slide decks).
//!
//! Parts are located by searching the raw container bytes for the part name
//! and checking that the hit sits inside a local file header. The central
//! directory is never read and entries are never inflated: a part stored
//! with compression yields no text.

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::ContainerSettings;
use crate::extract::{ExtractionMethod, ExtractionResult};
use crate::pdf::strategies::find;
use crate::text::Normalizer;

const LOCAL_HEADER_SIG: &[u8] = b"PK\x03\x04";
const CENTRAL_HEADER_SIG: &[u8] = b"PK\x01\x02";
const LOCAL_HEADER_LEN: usize = 30;
const METHOD_STORED: u16 = 0;

pub const WORD_DOCUMENT_PART: &str = "word/document.xml";

/// A content tag whose text is harvested, paired with the paragraph or break
/// tag that ends a line.
#[derive(Debug, Clone, Copy)]
pub struct TagPair {
    pub content: &'static str,
    pub line_break: &'static str,
}

pub const WORD_TAGS: &[TagPair] = &[
    TagPair { content: "w:t", line_break: "w:p" },
    TagPair { content: "w:t", line_break: "w:br" },
];

pub const SLIDE_TAGS: &[TagPair] = &[
    TagPair { content: "a:t", line_break: "a:p" },
    TagPair { content: "a:t", line_break: "a:br" },
];

/// Element names of a table, its rows and its cells.
#[derive(Debug, Clone, Copy)]
pub struct TableTags {
    pub table: &'static str,
    pub row: &'static str,
    pub cell: &'static str,
}

pub const WORD_TABLE: TableTags = TableTags { table: "w:tbl", row: "w:tr", cell: "w:tc" };

pub const SLIDE_TABLE: TableTags = TableTags { table: "a:tbl", row: "a:tr", cell: "a:tc" };

pub fn slide_part(index: usize) -> String {
    format!("ppt/slides/slide{}.xml", index)
}

pub fn notes_part(index: usize) -> String {
    format!("ppt/notesSlides/notesSlide{}.xml", index)
}

/// Extracts text between configured XML tags.
pub struct TagHarvester {
    pattern: Regex,
    table: Regex,
    row: Regex,
    cell: Regex,
}

fn element_pattern(tag: &str, capture: bool) -> Result<Regex> {
    let tag = regex::escape(tag);
    let body = if capture { "(.*?)" } else { ".*?" };
    Regex::new(&format!(r"(?s)<{t}(?:\s[^>]*)?>{b}</{t}>", t = tag, b = body))
        .with_context(|| format!("{} element pattern", tag))
}

impl TagHarvester {
    pub fn new(pairs: &[TagPair], table: TableTags) -> Result<Self> {
        let mut content: Vec<&str> = pairs.iter().map(|p| p.content).collect();
        let mut breaks: Vec<&str> = pairs.iter().map(|p| p.line_break).collect();
        content.sort_unstable();
        content.dedup();
        breaks.sort_unstable();
        breaks.dedup();

        let alternation = |tags: &[&str]| {
            tags.iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|")
        };
        let content = alternation(&content);
        let breaks = alternation(&breaks);

        // Group 1: content text. A match without it is a line break.
        let pattern = format!(
            r"<(?:{c})(?:\s[^>]*)?>([^<]*)</(?:{c})>|</(?:{b})>|<(?:{b})(?:\s[^>]*)?/>",
            c = content,
            b = breaks
        );
        Ok(Self {
            pattern: Regex::new(&pattern).context("tag harvest pattern")?,
            table: element_pattern(table.table, false)?,
            row: element_pattern(table.row, true)?,
            cell: element_pattern(table.cell, true)?,
        })
    }

    /// Harvested text: content separated by spaces, a newline per break tag,
    /// and a `[Table]` block in place of each table.
    pub fn harvest(&self, xml: &str) -> String {
        let mut out = String::new();
        let mut last = 0;
        for table in self.table.find_iter(xml) {
            out.push_str(&self.harvest_runs(&xml[last..table.start()]));
            last = table.end();

            let Some(rendered) = self.render_table(table.as_str()) else {
                continue;
            };
            out.truncate(out.trim_end().len());
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str("[Table]\n");
            out.push_str(&rendered);
            out.push_str("\n\n");
        }
        out.push_str(&self.harvest_runs(&xml[last..]));
        out
    }

    fn harvest_runs(&self, xml: &str) -> String {
        let mut out = String::new();
        for caps in self.pattern.captures_iter(xml) {
            match caps.get(1) {
                Some(text) => {
                    out.push_str(&html_escape::decode_html_entities(text.as_str()));
                    out.push(' ');
                }
                None => out.push('\n'),
            }
        }
        out
    }

    /// Rows joined by newlines, cells by ` | `. `None` when every cell is empty.
    fn render_table(&self, xml: &str) -> Option<String> {
        let mut has_text = false;
        let rows: Vec<String> = self
            .row
            .captures_iter(xml)
            .filter_map(|row| {
                let cells: Vec<String> = self
                    .cell
                    .captures_iter(row.get(1)?.as_str())
                    .filter_map(|cell| {
                        let text = self.harvest_runs(cell.get(1)?.as_str());
                        Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
                    })
                    .collect();
                if cells.is_empty() {
                    return None;
                }
                has_text |= cells.iter().any(|c| !c.is_empty());
                Some(cells.join(" | "))
            })
            .collect();

        has_text.then(|| rows.join("\n"))
    }
}

/// Locate a stored part by name and return its raw bytes.
///
/// Only hits that start a local file header's name field with a matching
/// name length are accepted. Returns `None` when the part is absent or is
/// stored compressed.
pub fn find_part<'a>(container: &'a [u8], name: &str) -> Option<&'a [u8]> {
    let needle = name.as_bytes();
    let mut pos = 0;

    while let Some(offset) = find(&container[pos..], needle) {
        let name_at = pos + offset;
        pos = name_at + 1;

        let Some(header) = name_at.checked_sub(LOCAL_HEADER_LEN) else {
            continue;
        };
        if container.get(header..header + 4) != Some(LOCAL_HEADER_SIG) {
            continue;
        }
        let (Some(method), Some(size), Some(name_len), Some(extra_len)) = (
            le_u16(container, header + 8),
            le_u32(container, header + 18),
            le_u16(container, header + 26),
            le_u16(container, header + 28),
        ) else {
            continue;
        };
        if name_len as usize != needle.len() {
            continue;
        }

        if method != METHOD_STORED {
            tracing::debug!(part = name, method, "Part is compressed, not harvested");
            return None;
        }

        let data_start = (name_at + needle.len() + extra_len as usize).min(container.len());
        let data_end = if size > 0 {
            (data_start + size as usize).min(container.len())
        } else {
            // Size deferred to a data descriptor: run to the next header
            let rest = &container[data_start..];
            [LOCAL_HEADER_SIG, CENTRAL_HEADER_SIG]
                .iter()
                .filter_map(|sig| find(rest, sig))
                .min()
                .map_or(container.len(), |end| data_start + end)
        };
        return Some(&container[data_start..data_end]);
    }

    None
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let raw = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

fn le_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Harvest one part; `None` when the part cannot be found.
pub fn harvest_part(container: &[u8], name: &str, harvester: &TagHarvester) -> Option<String> {
    let data = find_part(container, name)?;
    Some(harvester.harvest(&String::from_utf8_lossy(data)))
}

/// Harvest parts `1..=max_parts` named by `part_name`, stopping at the first
/// index that is missing.
pub fn harvest_indexed_parts(
    container: &[u8],
    part_name: impl Fn(usize) -> String,
    harvester: &TagHarvester,
    max_parts: usize,
) -> Vec<(usize, String)> {
    let mut parts = Vec::new();
    for index in 1..=max_parts {
        match harvest_part(container, &part_name(index), harvester) {
            Some(text) => parts.push((index, text)),
            None => break,
        }
    }
    parts
}

/// Extractor for word-processor documents and slide decks.
pub struct ContainerExtractor {
    settings: ContainerSettings,
    word: TagHarvester,
    slides: TagHarvester,
    notes_shape: Regex,
    notes_body: Regex,
}

impl ContainerExtractor {
    pub fn new(settings: ContainerSettings) -> Result<Self> {
        Ok(Self {
            settings,
            word: TagHarvester::new(WORD_TAGS, WORD_TABLE)?,
            slides: TagHarvester::new(SLIDE_TAGS, SLIDE_TABLE)?,
            notes_shape: element_pattern("p:sp", false)?,
            notes_body: Regex::new(r#"<p:ph\s[^>]*\btype="body""#).context("notes body pattern")?,
        })
    }

    /// Text of the body placeholder in a slide's notes part.
    ///
    /// Other shapes on the notes page (slide image, slide number field,
    /// header and footer) are skipped.
    fn speaker_notes(&self, bytes: &[u8], index: usize) -> Option<String> {
        let data = find_part(bytes, &notes_part(index))?;
        let xml = String::from_utf8_lossy(data);
        let notes: String = self
            .notes_shape
            .find_iter(&xml)
            .map(|shape| shape.as_str())
            .filter(|shape| self.notes_body.is_match(shape))
            .map(|shape| self.slides.harvest(shape))
            .collect();
        let notes = notes.trim();
        (!notes.is_empty()).then(|| notes.to_string())
    }

    /// Text runs and paragraphs of the main document part.
    pub fn extract_document(&self, bytes: &[u8], normalizer: &Normalizer) -> ExtractionResult {
        let raw = harvest_part(bytes, WORD_DOCUMENT_PART, &self.word).unwrap_or_default();
        let text = normalizer.normalize(&raw);

        tracing::debug!(chars = text.len(), "Word document harvested");

        ExtractionResult {
            text,
            page_count: 1,
            method: ExtractionMethod::Text,
            is_scanned: false,
        }
    }

    /// One `[Slide N]` section per slide part, in index order.
    pub fn extract_slides(&self, bytes: &[u8], normalizer: &Normalizer) -> ExtractionResult {
        let slides = harvest_indexed_parts(bytes, slide_part, &self.slides, self.settings.max_parts);

        let sections: Vec<String> = slides
            .iter()
            .map(|(index, text)| {
                let mut section = format!("[Slide {}]\n{}", index, text.trim());
                if self.settings.include_speaker_notes {
                    if let Some(notes) = self.speaker_notes(bytes, *index) {
                        section.push_str("\n\n[Speaker Notes]\n");
                        section.push_str(&notes);
                    }
                }
                section
            })
            .collect();

        tracing::debug!(slides = slides.len(), "Slide deck harvested");

        ExtractionResult {
            text: normalizer.normalize(&sections.join("\n\n")),
            page_count: slides.len().max(1),
            method: ExtractionMethod::Text,
            is_scanned: false,
        }
    }
}
