//! accesspdf: Repair PDF accessibility.
//!
//! This is the engine crate. It tags untagged documents, repairs metadata,
//! reading order, headings, tables, links and bookmarks, and manages alt
//! text through a reviewable sidecar file.
//!
//! # Architecture
//!
//! - **accesspdf-core**: Backend-independent data types and algorithms
//! - **accesspdf-parse**: lopdf object layer and content stream model
//! - **accesspdf** (this crate): structure tree, processors, pipeline,
//!   alt-text workflow and batch runner
//!
//! ```ignore
//! use accesspdf::{Config, Pipeline};
//!
//! let pipeline = Pipeline::new(Config::load(None)?);
//! let result = pipeline.run("in.pdf".as_ref(), "in_accessible.pdf".as_ref(), None)?;
//! assert!(result.all_succeeded());
//! ```

pub mod alttext;
pub mod analyzer;
pub mod batch;
pub mod config;
pub mod mcid_text;
pub mod parent_tree;
pub mod pipeline;
pub mod processors;
pub mod providers;
pub mod struct_tree;
pub mod timebox;
pub mod xmp;

#[cfg(test)]
mod test_support;

pub use analyzer::{analyze, analyze_file};
pub use batch::{BatchItem, BatchOptions, plan_batch, process_directory, run_batch};
pub use config::Config;
pub use pipeline::{Pipeline, default_output_path, inject_file};
pub use processors::{Processor, default_processors};
pub use providers::{AltTextProvider, AltTextRequest, AltTextResult, NoOpProvider, ProviderError, Throttled};
pub use struct_tree::{StructElement, StructTree};

pub use accesspdf_core;
pub use accesspdf_core::{
    AnalysisResult, BatchResult, PdfError, ProcessorResult, RemediationResult, SidecarFile,
};
pub use accesspdf_parse;
pub use accesspdf_parse::PdfDocument;
