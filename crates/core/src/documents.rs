//! Local document conversion.
//!
//! Dispatches on the file extension: HTML goes through the converter
//! without boilerplate removal, Markdown and text pass through, PDF text is
//! extracted with `pdf-extract`.

use std::fs;
use std::path::Path;

use crate::convert::{ConvertConfig, html_to_markdown};
use crate::postprocess::clean_markdown;
use crate::{C2mdError, Result};

/// Kinds of local documents that can be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Markdown,
    Pdf,
}

impl DocumentKind {
    /// Detect the document kind from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" | "xhtml" => Some(Self::Html),
            "md" | "markdown" | "txt" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Convert a local document to Markdown.
pub fn convert_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(C2mdError::FileNotFound(path.to_path_buf()));
    }

    let kind = DocumentKind::from_path(path).ok_or_else(|| C2mdError::UnsupportedDocument(path.to_path_buf()))?;
    tracing::debug!(path = %path.display(), ?kind, "converting document");

    match kind {
        DocumentKind::Html => {
            let html = fs::read_to_string(path)?;
            let markdown = html_to_markdown(&html, &ConvertConfig::raw())?;
            Ok(clean_markdown(&markdown))
        }
        DocumentKind::Markdown => Ok(fs::read_to_string(path)?),
        DocumentKind::Pdf => extract_pdf_text(path),
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf_text(path: &Path) -> Result<String> {
    let text = pdf_extract::extract_text(path).map_err(|e| C2mdError::PdfError(e.to_string()))?;
    let text = text.trim();
    // Scanned PDFs without a text layer extract to nothing.
    if text.is_empty() {
        return Err(C2mdError::NoContent);
    }
    Ok(text.to_string())
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf_text(path: &Path) -> Result<String> {
    Err(C2mdError::UnsupportedDocument(path.to_path_buf()))
}
