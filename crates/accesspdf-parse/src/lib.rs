//! accesspdf-parse: lopdf object layer and content stream model.
//!
//! This crate wraps a [`lopdf::Document`] as an object arena
//! ([`PdfDocument`]), tokenizes and re-serializes content streams, splices
//! marked-content regions into them, and replays them to recover per-MCID
//! text, positions, font runs and ruling lines.

pub mod document;
pub mod error;
pub mod regions;
pub mod replay;
pub mod serialize;
pub mod text_state;
pub mod tokenizer;

pub use document::{
    ImageXObject, PdfDocument, XObjectKind, content_hash, decode_pdf_string, dict_string,
    encode_text_string, number, stream_bytes,
};
pub use error::BackendError;
pub use regions::{RegionKind, TaggedContent, TaggedRegion, check_nesting, next_mcid};
pub use replay::PositionedRun;
pub use serialize::serialize;
pub use tokenizer::{Operand, Operator, tokenize};

pub use lopdf;
pub use accesspdf_core;
