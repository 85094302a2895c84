//! Error types for c2md operations.
//!
//! This module defines the main error type [`C2mdError`] which represents
//! all possible errors that can occur while fetching, converting, crawling
//! and writing output.
//!
//! # Example
//!
//! ```rust
//! use c2md_core::{C2mdError, Result};
//!
//! fn require_html(html: &str) -> Result<&str> {
//!     if html.trim().is_empty() {
//!         return Err(C2mdError::NoContent);
//!     }
//!     Ok(html)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for c2md operations.
#[derive(Error, Debug)]
pub enum C2mdError {
    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps network errors, DNS failures, TLS failures and
    /// other HTTP-related problems.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    ///
    /// Returned when a URL cannot be parsed or does not use http(s).
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A CSS selector could not be parsed.
    #[error("Invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// HTML rewriting errors.
    #[error("Failed to process HTML: {0}")]
    HtmlParseError(String),

    /// Headless browser failures (launch, navigation, capture).
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// The fetch did not produce a capture the output mode needs.
    #[error("No {kind} data captured (the browser is required for this mode)")]
    MissingCapture { kind: &'static str },

    /// Image decoding or encoding errors.
    #[error("Image processing failed: {0}")]
    ImageError(#[from] image::ImageError),

    /// No content could be extracted from the document.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Local document type that has no converter.
    #[error("Unsupported document type: {0}")]
    UnsupportedDocument(PathBuf),

    /// PDF text extraction errors.
    #[error("PDF extraction failed: {0}")]
    PdfError(String),

    /// File read/write errors.
    #[error("I/O error: {0}")]
    WriteError(#[from] std::io::Error),

    /// JSON serialization errors.
    #[error("Serialization failed: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Result type alias for C2mdError.
pub type Result<T> = std::result::Result<T, C2mdError>;
