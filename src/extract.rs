//! Ranked text-extraction strategies for source documents.
//!
//! An [`Extractor`] owns an ordered list of [`ExtractStrategy`]
//! implementations. Availability is probed once at construction —
//! never re-decided per call — and each extraction uses the first
//! available strategy that supports the content type. Strategies return
//! plain UTF-8 text; the extractor wraps it into [`Extracted`] together
//! with provenance metadata and the reference-list heuristic.
//!
//! Bundled strategies: PDF (`pdf-extract`), DOCX (`zip` + `quick-xml`),
//! and plain text / Markdown passthrough.

use std::io::Read;

use crate::error::ExtractError;
use crate::models::Metadata;

/// Supported MIME types.
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb
/// protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Result of extracting one source document.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Plain text body.
    pub text: String,
    /// Provenance: content type and the strategy that produced the text.
    pub metadata: Metadata,
    /// Lines recognized as bibliography entries, if the text has a
    /// references section.
    pub references: Vec<String>,
}

/// One ranked extraction capability.
pub trait ExtractStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Probed once when the [`Extractor`] is built. A strategy backed by
    /// an optional runtime dependency reports `false` here instead of
    /// failing per call.
    fn is_available(&self) -> bool {
        true
    }

    /// Whether this strategy handles the given content type.
    fn supports(&self, content_type: &str) -> bool;

    /// Extract plain text. Must not panic on malformed input; the batch
    /// pipeline records the error and skips the item.
    fn extract(&self, bytes: &[u8], content_type: &str) -> Result<String, ExtractError>;
}

/// Ordered strategy list with startup-resolved availability.
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractStrategy>>,
    available: Vec<bool>,
}

impl Extractor {
    /// Build from a ranked strategy list. Each strategy's availability
    /// is probed exactly once, here.
    pub fn new(strategies: Vec<Box<dyn ExtractStrategy>>) -> Self {
        let available = strategies.iter().map(|s| s.is_available()).collect();
        Self {
            strategies,
            available,
        }
    }

    /// The default ranking: PDF, DOCX, plain text.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Box::new(PdfStrategy),
            Box::new(DocxStrategy),
            Box::new(PlainTextStrategy),
        ])
    }

    /// Name of the strategy that would handle `content_type`, if any.
    pub fn strategy_for(&self, content_type: &str) -> Option<&'static str> {
        self.strategies
            .iter()
            .zip(&self.available)
            .find(|(s, ok)| **ok && s.supports(content_type))
            .map(|(s, _)| s.name())
    }

    /// Extract text and assemble the [`Extracted`] result.
    pub fn extract(&self, bytes: &[u8], content_type: &str) -> Result<Extracted, ExtractError> {
        let mut any_supports = false;
        for (strategy, ok) in self.strategies.iter().zip(&self.available) {
            if !strategy.supports(content_type) {
                continue;
            }
            any_supports = true;
            if !*ok {
                continue;
            }
            let text = strategy.extract(bytes, content_type)?;
            let references = extract_references(&text);
            let mut metadata = Metadata::new();
            metadata.insert("content_type".to_string(), content_type.into());
            metadata.insert("extractor".to_string(), strategy.name().into());
            return Ok(Extracted {
                text,
                metadata,
                references,
            });
        }
        if any_supports {
            Err(ExtractError::NoStrategy(content_type.to_string()))
        } else {
            Err(ExtractError::UnsupportedContentType(
                content_type.to_string(),
            ))
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============ PDF ============

/// PDF text extraction via `pdf-extract`.
pub struct PdfStrategy;

impl ExtractStrategy for PdfStrategy {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn supports(&self, content_type: &str) -> bool {
        content_type == MIME_PDF
    }

    fn extract(&self, bytes: &[u8], _content_type: &str) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    }
}

// ============ DOCX ============

/// DOCX extraction: `word/document.xml` text runs (`w:t` elements).
pub struct DocxStrategy;

impl ExtractStrategy for DocxStrategy {
    fn name(&self) -> &'static str {
        "docx-xml"
    }

    fn supports(&self, content_type: &str) -> bool {
        content_type == MIME_DOCX
    }

    fn extract(&self, bytes: &[u8], _content_type: &str) -> Result<String, ExtractError> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| ExtractError::Ooxml("word/document.xml not found".to_string()))?;

        let mut doc_xml = Vec::new();
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::Ooxml(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }

        extract_text_runs(&doc_xml)
    }
}

/// Collect the text of every `t` element, separating paragraphs (`p`
/// elements) with newlines so downstream chunking sees line boundaries.
fn extract_text_runs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.ends_with('\n') && !out.is_empty() {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

// ============ Plain text ============

/// UTF-8 passthrough for plain text and Markdown.
pub struct PlainTextStrategy;

impl ExtractStrategy for PlainTextStrategy {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn supports(&self, content_type: &str) -> bool {
        content_type == MIME_TEXT || content_type == MIME_MARKDOWN
    }

    fn extract(&self, bytes: &[u8], _content_type: &str) -> Result<String, ExtractError> {
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| ExtractError::Encoding(e.to_string()))
    }
}

// ============ References ============

/// Pull bibliography entries out of extracted text.
///
/// Heuristic: once a line containing "references" or "bibliography" is
/// seen, collect subsequent non-empty lines that start with a digit or
/// `[` (the common `[1]` / `1.` citation formats).
pub fn extract_references(text: &str) -> Vec<String> {
    let mut references = Vec::new();
    let mut in_references = false;

    for line in text.lines() {
        let lower = line.trim().to_lowercase();
        if lower.contains("references") || lower.contains("bibliography") {
            in_references = true;
            continue;
        }
        if in_references {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let first = trimmed.chars().next().unwrap_or(' ');
            if first.is_ascii_digit() || trimmed.starts_with('[') {
                references.push(trimmed.to_string());
            }
        }
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_docx(phrase: &str) -> Vec<u8> {
        use std::io::Write;
        let mut buf = Vec::new();
        {
            let mut archive = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            archive
                .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
                phrase
            );
            archive.write_all(xml.as_bytes()).unwrap();
            archive.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_unsupported_content_type() {
        let e = Extractor::with_defaults();
        let err = e.extract(b"foo", "application/octet-stream").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }

    #[test]
    fn test_invalid_pdf_returns_error() {
        let e = Extractor::with_defaults();
        let err = e.extract(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn test_invalid_zip_returns_error_for_docx() {
        let e = Extractor::with_defaults();
        let err = e.extract(b"not a zip", MIME_DOCX).unwrap_err();
        assert!(matches!(err, ExtractError::Ooxml(_)));
    }

    #[test]
    fn test_docx_extraction() {
        let e = Extractor::with_defaults();
        let out = e.extract(&minimal_docx("hello from docx"), MIME_DOCX).unwrap();
        assert!(out.text.contains("hello from docx"));
        assert_eq!(
            out.metadata.get("extractor").and_then(|v| v.as_str()),
            Some("docx-xml")
        );
    }

    #[test]
    fn test_plain_text_passthrough() {
        let e = Extractor::with_defaults();
        let out = e.extract("just text".as_bytes(), MIME_TEXT).unwrap();
        assert_eq!(out.text, "just text");
        let out = e.extract("# heading".as_bytes(), MIME_MARKDOWN).unwrap();
        assert_eq!(out.text, "# heading");
    }

    #[test]
    fn test_plain_text_invalid_utf8() {
        let e = Extractor::with_defaults();
        let err = e.extract(&[0xff, 0xfe, 0xfd], MIME_TEXT).unwrap_err();
        assert!(matches!(err, ExtractError::Encoding(_)));
    }

    struct UnavailableText;
    impl ExtractStrategy for UnavailableText {
        fn name(&self) -> &'static str {
            "unavailable"
        }
        fn is_available(&self) -> bool {
            false
        }
        fn supports(&self, content_type: &str) -> bool {
            content_type == MIME_TEXT
        }
        fn extract(&self, _: &[u8], _: &str) -> Result<String, ExtractError> {
            unreachable!("never selected")
        }
    }

    #[test]
    fn test_resolution_skips_unavailable_strategy() {
        // First-ranked strategy is down; the next one that supports the
        // type wins.
        let e = Extractor::new(vec![
            Box::new(UnavailableText),
            Box::new(PlainTextStrategy),
        ]);
        let out = e.extract(b"fallback works", MIME_TEXT).unwrap();
        assert_eq!(
            out.metadata.get("extractor").and_then(|v| v.as_str()),
            Some("plain-text")
        );
        assert_eq!(e.strategy_for(MIME_TEXT), Some("plain-text"));
    }

    #[test]
    fn test_no_available_strategy() {
        let e = Extractor::new(vec![Box::new(UnavailableText)]);
        let err = e.extract(b"text", MIME_TEXT).unwrap_err();
        assert!(matches!(err, ExtractError::NoStrategy(_)));
    }

    #[test]
    fn test_reference_extraction() {
        let text = "Body of the paper.\n\nReferences\n[1] First citation.\n2. Second citation.\nnot a citation\n";
        let refs = extract_references(text);
        assert_eq!(refs, vec!["[1] First citation.", "2. Second citation."]);
    }

    #[test]
    fn test_no_reference_section() {
        assert!(extract_references("Plain body text with no trailing section.").is_empty());
    }
}
