//! Error types for the object and content-stream layers.
//!
//! Uses [`thiserror`] for ergonomic error derivation. Provides [`BackendError`]
//! that wraps lopdf-level failures and converts them to [`PdfError`].

use accesspdf_core::PdfError;
use thiserror::Error;

/// Error type for lopdf-backed operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Error from PDF parsing (structure, syntax, object resolution).
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Error reading or writing PDF data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error tokenizing or replaying a content stream.
    #[error("interpreter error: {0}")]
    Interpreter(String),

    /// The structure tree has an unexpected shape.
    #[error("structure error: {0}")]
    Structure(String),

    /// A core library error.
    #[error(transparent)]
    Core(#[from] PdfError),
}

impl From<lopdf::Error> for BackendError {
    fn from(err: lopdf::Error) -> Self {
        BackendError::Parse(err.to_string())
    }
}

impl From<BackendError> for PdfError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Parse(msg) => PdfError::ParseError(msg),
            BackendError::Io(e) => PdfError::IoError(e.to_string()),
            BackendError::Interpreter(msg) => PdfError::InterpreterError(msg),
            BackendError::Structure(msg) => PdfError::StructureError(msg),
            BackendError::Core(e) => e,
        }
    }
}
