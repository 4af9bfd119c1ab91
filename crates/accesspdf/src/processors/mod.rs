//! Remediation passes.
//!
//! Each pass implements [`Processor`] and runs against the one
//! exclusively borrowed [`PdfDocument`]. The pipeline runs them in the
//! order returned by [`default_processors`]; later passes rely on the
//! structure established by earlier ones.

mod bookmarks;
mod headings;
mod links;
mod metadata;
mod reading_order;
mod tables;
mod tagger;

pub use bookmarks::BookmarksProcessor;
pub use headings::HeadingsProcessor;
pub use links::LinksProcessor;
pub use metadata::{MetadataProcessor, UNTITLED, derive_title, docinfo_title};
pub use reading_order::ReadingOrderProcessor;
pub use tables::TablesProcessor;
pub use tagger::TaggerProcessor;

use accesspdf_core::{PdfError, ProcessorResult};
use accesspdf_parse::PdfDocument;
use lopdf::{Dictionary, Object};

use crate::config::Config;

/// One remediation pass.
pub trait Processor: Send + Sync {
    /// Name reported in [`ProcessorResult::processor_name`].
    fn name(&self) -> &'static str;

    /// Apply the pass. Recoverable problems become warnings on the result;
    /// an `Err` marks the whole pass as failed.
    fn process(&self, doc: &mut PdfDocument, config: &Config) -> Result<ProcessorResult, PdfError>;
}

/// The passes in execution order.
pub fn default_processors() -> Vec<Box<dyn Processor>> {
    vec![
        Box::new(TaggerProcessor),
        Box::new(MetadataProcessor),
        Box::new(ReadingOrderProcessor),
        Box::new(HeadingsProcessor),
        Box::new(TablesProcessor),
        Box::new(LinksProcessor),
        Box::new(BookmarksProcessor),
    ]
}

/// Set `/MarkInfo /Marked true` on the catalog. Returns whether it was
/// not already set.
pub(crate) fn ensure_mark_info(doc: &mut PdfDocument) -> Result<bool, PdfError> {
    ensure_catalog_flag(doc, "MarkInfo", "Marked")
}

/// Set `flag` to `true` inside the catalog dictionary `entry`, creating the
/// dictionary when missing. Returns whether anything changed.
pub(crate) fn ensure_catalog_flag(
    doc: &mut PdfDocument,
    entry: &str,
    flag: &str,
) -> Result<bool, PdfError> {
    let existing = doc.catalog()?.get(entry.as_bytes()).ok().cloned();
    let is_set = |dict: &Dictionary| matches!(dict.get(flag.as_bytes()), Ok(Object::Boolean(true)));
    match existing {
        Some(Object::Reference(id)) => {
            let dict = doc.dict_mut(id)?;
            if is_set(dict) {
                return Ok(false);
            }
            dict.set(flag, true);
        }
        Some(Object::Dictionary(mut dict)) => {
            if is_set(&dict) {
                return Ok(false);
            }
            dict.set(flag, true);
            doc.catalog_mut()?.set(entry, dict);
        }
        _ => {
            let mut dict = Dictionary::new();
            dict.set(flag, true);
            doc.catalog_mut()?.set(entry, dict);
        }
    }
    Ok(true)
}
