//! Text Extractor — turns uploaded document bytes into plain text.
//!
//! Strategy is selected by the declared document kind. DOCX decoding spills
//! the upload to a named temp file for the archive reader; the temp file is
//! removed on every exit path when the handle drops.

use std::io::{Read, Write};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to extract text: {0}")]
    Failure(String),
}

/// The supported document kinds, as declared by the upload layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    /// Resolves the declared kind from the uploaded filename's extension.
    pub fn from_filename(name: &str) -> Result<Self, ExtractError> {
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => return Err(ExtractError::UnsupportedFormat(name.to_string())),
        };
        match ext.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" | "doc" => Ok(DocumentKind::Docx),
            "txt" | "text" | "md" => Ok(DocumentKind::PlainText),
            other => Err(ExtractError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

/// Decodes `bytes` under the declared `kind`.
///
/// Plain text decoding is permissive and never fails: invalid sequences are
/// replaced, not rejected.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractError> {
    match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractError::Failure(format!("PDF decode failed: {e}"))),
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::PlainText => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// A DOCX is a zip archive; the document body lives in `word/document.xml`.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ExtractError::Failure(format!("temp file creation failed: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ExtractError::Failure(format!("temp file write failed: {e}")))?;

    let file = tmp
        .reopen()
        .map_err(|e| ExtractError::Failure(format!("temp file reopen failed: {e}")))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ExtractError::Failure(format!("not a DOCX archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Failure(format!("DOCX has no document body: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Failure(format!("DOCX body is not readable: {e}")))?;

    Ok(document_xml_to_text(&xml))
}

/// Paragraph closes become line breaks, remaining markup is dropped, and the
/// handful of XML entities WordprocessingML emits are decoded.
fn document_xml_to_text(xml: &str) -> String {
    let with_breaks = xml.replace("</w:p>", "\n");
    let stripped = TAGS.replace_all(&with_breaks, "");

    let decoded = stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'");

    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
