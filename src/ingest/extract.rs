//! Format-specific text extraction.
//!
//! Each extractor turns one file into one or more `(text, metadata)` sections: PDFs yield a
//! section per page, every other format a single section.

use crate::ingest::types::ExtractionError;
use pulldown_cmark::{Event, Parser, TagEnd};
use quick_xml::events::Event as XmlEvent;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Formats the loader understands, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Plain UTF-8 text.
    Text,
    /// Office Open XML word-processing document.
    Docx,
    /// CommonMark markdown.
    Markdown,
}

impl DocumentFormat {
    /// Match a path's extension (case-insensitive) against the supported set.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            "docx" => Some(Self::Docx),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Short lowercase name stored in document metadata.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "txt",
            Self::Docx => "docx",
            Self::Markdown => "md",
        }
    }
}

/// Extracted section text with its metadata.
pub(crate) type Section = (String, BTreeMap<String, String>);

/// Dispatch to the extractor for `format`.
pub(crate) fn extract(path: &Path, format: DocumentFormat) -> Result<Vec<Section>, ExtractionError> {
    match format {
        DocumentFormat::Pdf => extract_pdf(path),
        DocumentFormat::Text => Ok(vec![single(format, read_text(path)?)]),
        DocumentFormat::Docx => Ok(vec![single(format, extract_docx(path)?)]),
        DocumentFormat::Markdown => Ok(vec![single(format, markdown_to_text(&read_text(path)?))]),
    }
}

fn single(format: DocumentFormat, text: String) -> Section {
    let mut metadata = BTreeMap::new();
    metadata.insert("format".to_string(), format.name().to_string());
    (text, metadata)
}

fn read_text(path: &Path) -> Result<String, ExtractionError> {
    std::fs::read_to_string(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn format_error(format: &'static str, path: &Path, message: impl ToString) -> ExtractionError {
    ExtractionError::Format {
        format,
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn extract_pdf(path: &Path) -> Result<Vec<Section>, ExtractionError> {
    let document = lopdf::Document::load(path).map_err(|err| format_error("pdf", path, err))?;
    let pages = document.get_pages();
    let total_pages = pages.len();

    let mut sections = Vec::with_capacity(total_pages);
    for page_number in pages.keys() {
        let text = document
            .extract_text(&[*page_number])
            .map_err(|err| format_error("pdf", path, err))?;
        let (_, mut metadata) = single(DocumentFormat::Pdf, String::new());
        metadata.insert("page".to_string(), page_number.to_string());
        metadata.insert("total_pages".to_string(), total_pages.to_string());
        sections.push((text, metadata));
    }
    Ok(sections)
}

fn extract_docx(path: &Path) -> Result<String, ExtractionError> {
    let file = std::fs::File::open(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| format_error("docx", path, err))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| format_error("docx", path, err))?
        .read_to_string(&mut xml)
        .map_err(|err| format_error("docx", path, err))?;
    docx_xml_to_text(&xml).map_err(|err| format_error("docx", path, err))
}

/// Collect the text runs of a `word/document.xml` body, one paragraph per block.
pub(crate) fn docx_xml_to_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            XmlEvent::Start(element) if element.name().as_ref() == b"w:t" => in_run_text = true,
            XmlEvent::End(element) => match element.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            XmlEvent::Empty(element) => match element.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            XmlEvent::Text(run) if in_run_text => text.push_str(&run.unescape()?),
            XmlEvent::Eof => break,
            _ => {}
        }
    }

    Ok(text.trim_end().to_string())
}

/// Render markdown as plain text, separating blocks with blank lines.
pub(crate) fn markdown_to_text(source: &str) -> String {
    let mut text = String::new();
    for event in Parser::new(source) {
        match event {
            Event::Text(run) | Event::Code(run) => text.push_str(&run),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => {
                if !text.ends_with("\n\n") {
                    text.push_str("\n\n");
                }
            }
            _ => {}
        }
    }
    text.trim_end().to_string()
}
