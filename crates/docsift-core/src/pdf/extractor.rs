use anyhow::Result;
use regex::bytes::Regex;

use crate::config::PdfSettings;
use crate::extract::{ExtractionMethod, ExtractionResult, ENCRYPTED_PDF_SENTINEL, SCANNED_PDF_SENTINEL};
use crate::text::Normalizer;

use super::strategies::{
    find, HexStringStrategy, LiteralStringStrategy, RecoveryStrategy, ShowTextStrategy,
    WordSequenceStrategy,
};

const ENCRYPT_MARKER: &[u8] = b"/Encrypt";
const IMAGE_MARKERS: [&[u8]; 2] = [b"/Image", b"/XObject"];

/// Heuristic PDF text extractor.
///
/// Works on raw bytes without parsing the object graph: counts page objects,
/// refuses encrypted files, runs every [`RecoveryStrategy`] in order and
/// concatenates what they find. Fragments recovered by more than one
/// strategy appear more than once.
pub struct PdfExtractor {
    settings: PdfSettings,
    strategies: Vec<Box<dyn RecoveryStrategy>>,
    page_object: Regex,
    end_stream: Regex,
}

impl PdfExtractor {
    /// Build an extractor with the default strategy order: literal strings,
    /// hex strings, show-text operators, word sequences.
    pub fn new(settings: PdfSettings) -> Result<Self> {
        let strategies: Vec<Box<dyn RecoveryStrategy>> = vec![
            Box::new(LiteralStringStrategy),
            Box::new(HexStringStrategy::new(settings.max_hex_matches)?),
            Box::new(ShowTextStrategy::new(
                settings.max_text_object_len,
                settings.max_show_text_len,
            )?),
            Box::new(WordSequenceStrategy::new(settings.max_word_sequences)?),
        ];
        Self::with_strategies(settings, strategies)
    }

    /// Build an extractor that runs `strategies` in the given order.
    pub fn with_strategies(
        settings: PdfSettings,
        strategies: Vec<Box<dyn RecoveryStrategy>>,
    ) -> Result<Self> {
        Ok(Self {
            settings,
            strategies,
            page_object: Regex::new(r"(?-u)/Type\s*/Page\b")?,
            end_stream: Regex::new(r"(?-u)endstream")?,
        })
    }

    /// Approximate page count: occurrences of `/Type /Page`, at least 1.
    pub fn count_pages(&self, pdf: &[u8]) -> usize {
        self.page_object.find_iter(pdf).count().max(1)
    }

    pub fn is_encrypted(&self, pdf: &[u8]) -> bool {
        find(pdf, ENCRYPT_MARKER).is_some()
    }

    /// Run every strategy and join the fragments in strategy order.
    pub fn recover_text(&self, pdf: &[u8]) -> String {
        let mut fragments = Vec::new();
        for strategy in &self.strategies {
            let found = strategy.recover(pdf);
            tracing::debug!(strategy = strategy.name(), fragments = found.len(), "PDF strategy finished");
            fragments.extend(found);
        }
        fragments.join(" ")
    }

    pub fn extract(&self, bytes: &[u8], normalizer: &Normalizer) -> ExtractionResult {
        let pdf = &bytes[..bytes.len().min(self.settings.max_scan_bytes)];
        let page_count = self.count_pages(pdf);

        if self.is_encrypted(pdf) {
            tracing::info!(page_count, "PDF is encrypted, skipping extraction");
            return ExtractionResult {
                text: ENCRYPTED_PDF_SENTINEL.to_string(),
                page_count,
                method: ExtractionMethod::Fallback,
                is_scanned: false,
            };
        }

        let mut text = normalizer.normalize_pdf(&self.recover_text(pdf));
        let text_chars = text.chars().count();
        let is_scanned = self.looks_scanned(pdf, page_count, text_chars);

        if is_scanned && text_chars < self.settings.scan.sentinel_below {
            text = SCANNED_PDF_SENTINEL.to_string();
        }

        tracing::debug!(page_count, text_chars, is_scanned, "PDF heuristics finished");

        ExtractionResult {
            text,
            page_count,
            method: ExtractionMethod::Text,
            is_scanned,
        }
    }

    /// Image or XObject markers, more streams than pages, and little text.
    fn looks_scanned(&self, pdf: &[u8], page_count: usize, text_chars: usize) -> bool {
        let scan = &self.settings.scan;
        if text_chars >= scan.text_ceiling {
            return false;
        }
        if !IMAGE_MARKERS.iter().any(|marker| find(pdf, marker).is_some()) {
            return false;
        }
        let streams = self.end_stream.find_iter(pdf).count();
        streams as f64 > page_count as f64 * scan.stream_page_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};

    fn extractor() -> PdfExtractor {
        PdfExtractor::new(PdfSettings::default()).unwrap()
    }

    fn extract(bytes: &[u8]) -> ExtractionResult {
        extractor().extract(bytes, &Normalizer::new().unwrap())
    }

    /// Create a minimal PDF with one page per entry, each page showing its text
    fn create_test_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut page_ids = Vec::new();
        for text in page_texts {
            let content = format!(
                "BT /F1 12 Tf 100 700 Td ({}) Tj ET",
                text.replace('\\', "\\\\")
                    .replace('(', "\\(")
                    .replace(')', "\\)")
            );
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            page_ids.push(page_id);
        }

        let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_texts.len() as i64),
        });

        for page_id in &page_ids {
            if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(*page_id) {
                dict.set("Parent", pages_id);
            }
        }

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// Image-only PDF: one page object, many image XObject streams, no text
    fn create_scanned_pdf(images: usize) -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n1 0 obj\n<< /Type /Page /MediaBox [0 0 612 792] >>\nendobj\n".to_vec();
        for i in 0..images {
            pdf.extend_from_slice(
                format!(
                    "{} 0 obj\n<< /Type /XObject /Subtype /Image /Width 8 /Height 8 /Length 6 >>\nstream\n",
                    i + 2
                )
                .as_bytes(),
            );
            pdf.extend_from_slice(&[0x00, 0x9f, 0xff, 0x10, 0x80, 0x01]);
            pdf.extend_from_slice(b"\nendstream\nendobj\n");
        }
        pdf.extend_from_slice(b"%%EOF\n");
        pdf
    }

    #[test]
    fn test_extract_show_text_pdf() {
        let pdf = create_test_pdf(&["Hello World"]);
        let result = extract(&pdf);

        assert!(
            result.text.contains("Hello World"),
            "Expected text to contain 'Hello World', got: '{}'",
            result.text
        );
        assert_eq!(result.method, ExtractionMethod::Text);
        assert!(!result.is_scanned);
        assert_eq!(result.page_count, 1);
    }

    #[test]
    fn test_extract_handcrafted_bt_block() {
        let pdf = b"%PDF-1.4\n4 0 obj\n<< /Length 44 >>\nstream\nBT /F1 24 Tf 72 712 Td (Hello World) Tj ET\nendstream\nendobj\n%%EOF";
        let result = extract(pdf);

        assert!(result.text.contains("Hello World"));
        assert_eq!(result.method, ExtractionMethod::Text);
        assert!(!result.is_scanned);
    }

    #[test]
    fn test_strategies_duplicate_fragments() {
        // Literal and show-text strategies both see the same operand
        let pdf = b"%PDF-1.4\nBT (Quarterly) Tj ET\n%%EOF";
        let result = extract(pdf);
        assert_eq!(result.text.matches("Quarterly").count(), 2);
    }

    #[test]
    fn test_count_pages_multipage() {
        let pdf = create_test_pdf(&["Page One", "Page Two", "Page Three"]);
        let result = extract(&pdf);

        assert_eq!(result.page_count, 3);
        assert!(result.text.contains("Page Two"));
    }

    #[test]
    fn test_count_pages_floor_is_one() {
        assert_eq!(extractor().count_pages(b"no page objects here"), 1);
        assert_eq!(extractor().count_pages(b"/Type /Pages /Type/Page /Type /Page"), 2);
    }

    #[test]
    fn test_encrypted_pdf_returns_sentinel() {
        let pdf = b"%PDF-1.6\nBT (Secret quarterly figures) Tj ET\ntrailer << /Root 1 0 R /Encrypt 9 0 R >>\n%%EOF";
        let result = extract(pdf);

        assert_eq!(result.text, ENCRYPTED_PDF_SENTINEL);
        assert_eq!(result.method, ExtractionMethod::Fallback);
        assert!(!result.is_scanned);
    }

    #[test]
    fn test_scanned_pdf_flagged() {
        let pdf = create_scanned_pdf(12);
        let result = extract(&pdf);

        assert!(result.is_scanned);
        assert_eq!(result.text, SCANNED_PDF_SENTINEL);
        assert_eq!(result.method, ExtractionMethod::Text);
        assert_eq!(result.page_count, 1);
    }

    #[test]
    fn test_scanned_with_some_text_keeps_text() {
        let mut pdf = create_scanned_pdf(12);
        let caption = "Figure caption recovered from the page with enough words to pass the sentinel threshold easily";
        pdf.extend_from_slice(format!("BT ({}) Tj ET\n", caption).as_bytes());

        let result = extract(&pdf);
        assert!(result.is_scanned);
        assert!(result.text.contains(caption));
    }

    #[test]
    fn test_images_without_extra_streams_not_scanned() {
        // One page, one image stream: stream count does not exceed page count
        let pdf = create_scanned_pdf(1);
        let result = extract(&pdf);
        assert!(!result.is_scanned);
        assert_eq!(result.text, "");
    }

    #[test]
    fn test_scan_thresholds_are_configurable() {
        let mut settings = PdfSettings::default();
        settings.scan.stream_page_ratio = 20.0;
        let extractor = PdfExtractor::new(settings).unwrap();

        let result = extractor.extract(&create_scanned_pdf(12), &Normalizer::new().unwrap());
        assert!(!result.is_scanned);
    }

    #[test]
    fn test_scan_window_is_bounded() {
        let mut settings = PdfSettings::default();
        settings.max_scan_bytes = 16;
        let extractor = PdfExtractor::new(settings).unwrap();

        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.extend(std::iter::repeat(b' ').take(64));
        pdf.extend_from_slice(b"BT (Beyond the window) Tj ET");

        let result = extractor.extract(&pdf, &Normalizer::new().unwrap());
        assert_eq!(result.text, "");
    }

    #[test]
    fn test_hex_encoded_text_recovered() {
        let pdf = b"%PDF-1.4\nBT <0048006500610064006C0069006E0065> Tj ET\n%%EOF";
        let result = extract(pdf);
        assert!(result.text.contains("Headline"), "got: '{}'", result.text);
    }

    #[test]
    fn test_garbage_input_does_not_fail() {
        let garbage: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        let result = extract(&garbage);
        assert!(result.page_count >= 1);
        assert_eq!(result.method, ExtractionMethod::Text);
    }

    struct Fixed(&'static str);

    impl RecoveryStrategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn recover(&self, _pdf: &[u8]) -> Vec<String> {
            vec![self.0.to_string()]
        }
    }

    #[test]
    fn test_custom_strategy_order() {
        let extractor = PdfExtractor::with_strategies(
            PdfSettings::default(),
            vec![Box::new(Fixed("second")), Box::new(Fixed("first"))],
        )
        .unwrap();

        assert_eq!(extractor.recover_text(b"anything"), "second first");
    }
}
