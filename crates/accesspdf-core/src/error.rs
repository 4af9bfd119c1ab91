//! Error types for accesspdf-rs.
//!
//! Provides [`PdfError`] for fatal errors that stop a document or a pass.
//! Non-fatal issues are carried as plain strings on
//! [`ProcessorResult::warnings`](crate::ProcessorResult::warnings).

use std::fmt;
use std::path::PathBuf;

/// Fatal error types for PDF remediation.
///
/// A `PdfError` returned from a processor fails only that processor; one
/// returned while opening or saving a document fails the whole document.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Error parsing PDF structure or syntax.
    ParseError(String),
    /// I/O error reading or writing a file.
    IoError(String),
    /// Error during content stream tokenization or replay.
    InterpreterError(String),
    /// The structure tree is missing a required entry or has the wrong shape.
    StructureError(String),
    /// The alt-text sidecar file could not be read or written.
    SidecarError(String),
    /// Embedded image data could not be decoded.
    ImageError(String),
    /// The configuration file is malformed.
    ConfigError(String),
    /// Remediation was asked to overwrite its own input.
    SameInputOutput {
        /// The path given as both input and output.
        path: PathBuf,
    },
    /// The PDF is encrypted and cannot be remediated.
    PasswordRequired,
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::ParseError(msg) => write!(f, "parse error: {msg}"),
            PdfError::IoError(msg) => write!(f, "I/O error: {msg}"),
            PdfError::InterpreterError(msg) => write!(f, "interpreter error: {msg}"),
            PdfError::StructureError(msg) => write!(f, "structure error: {msg}"),
            PdfError::SidecarError(msg) => write!(f, "sidecar error: {msg}"),
            PdfError::ImageError(msg) => write!(f, "image error: {msg}"),
            PdfError::ConfigError(msg) => write!(f, "config error: {msg}"),
            PdfError::SameInputOutput { path } => write!(
                f,
                "refusing to write output over the input file: {}",
                path.display()
            ),
            PdfError::PasswordRequired => write!(f, "PDF is encrypted and requires a password"),
            PdfError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::IoError(err.to_string())
    }
}
