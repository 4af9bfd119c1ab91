//! accesspdf-core: Backend-independent data types and algorithms.
//!
//! This crate provides the remediation result types, the alt-text sidecar
//! model, structure roles, and the pure algorithms (outline nesting, heading
//! statistics, ruling-grid detection, contrast math, language
//! identification) used by accesspdf-rs. It does not depend on any PDF
//! library.

pub mod analysis;
pub mod bookmark;
pub mod contrast;
pub mod error;
pub mod geometry;
pub mod headings;
pub mod images;
pub mod language;
pub mod result;
pub mod role;
pub mod sidecar;
pub mod table;

pub use analysis::{AccessibilityIssue, AnalysisResult, Severity};
pub use bookmark::{Bookmark, HeadingEntry, OutlineNode, build_outline, flatten_outline};
pub use contrast::{PdfColorSpace, contrast_ratio, parse_pdf_color, passes_aa};
pub use error::PdfError;
pub use geometry::{Ctm, Point};
pub use headings::{HeadingMap, TextRun, is_bold_font, nesting_warnings};
pub use images::ImageInfo;
pub use language::{DEFAULT_LANGUAGE, detect_language, detect_language_or};
pub use result::{BatchResult, ProcessorResult, RemediationResult};
pub use role::StructRole;
pub use sidecar::{AltTextEntry, AltTextStatus, SidecarFile, SidecarStats};
pub use table::{DEFAULT_GRID_TOLERANCE, Rulings, Segment, TableGrid, find_grid};
