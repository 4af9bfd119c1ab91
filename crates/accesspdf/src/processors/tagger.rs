//! Bootstrap tagging.
//!
//! An untagged document gets a `StructTreeRoot`, a `Document` element and
//! one `P` or `Figure` element per text block or image on every page. An
//! already tagged document only gets the delta: `/Tabs /S` on pages that
//! lack it and `Figure` tags for image invocations outside any marked
//! content.

use accesspdf_core::{PdfError, ProcessorResult, StructRole};
use accesspdf_parse::regions::{tag_content, wrap_do_invocations};
use accesspdf_parse::{PdfDocument, RegionKind, TaggedContent, XObjectKind, next_mcid};
use lopdf::{Object, ObjectId};
use tracing::{debug, warn};

use super::{Processor, ensure_mark_info};
use crate::config::Config;
use crate::parent_tree::merge_parent_tree;
use crate::struct_tree::StructTree;

pub struct TaggerProcessor;

impl Processor for TaggerProcessor {
    fn name(&self) -> &'static str {
        "TagStructure"
    }

    fn process(&self, doc: &mut PdfDocument, _config: &Config) -> Result<ProcessorResult, PdfError> {
        let mut result = ProcessorResult::new(self.name());
        let changes = if StructTree::is_tagged(doc) {
            let tabs = ensure_tabs(doc)?;
            tabs + tag_untagged_images(doc, &mut result)?
        } else {
            tag_document(doc, &mut result)?
        };
        Ok(result.with_changes(changes))
    }
}

fn is_image(doc: &PdfDocument, index: usize, name: &str) -> bool {
    matches!(doc.xobject_kind(index, name), Ok(Some(XObjectKind::Image)))
}

/// Set `/Tabs /S` on every page without a `/Tabs` entry.
fn ensure_tabs(doc: &mut PdfDocument) -> Result<usize, PdfError> {
    let mut count = 0;
    for index in 0..doc.page_count() {
        let page = doc.page_dict_mut(index)?;
        if !page.has(b"Tabs") {
            page.set("Tabs", Object::Name(b"S".to_vec()));
            count += 1;
        }
    }
    Ok(count)
}

/// Create one element per new region, owning the region's MCID.
fn add_region_elements(
    doc: &mut PdfDocument,
    tree: &StructTree,
    parent: ObjectId,
    page: ObjectId,
    tagged: &TaggedContent,
) -> Result<usize, PdfError> {
    for region in &tagged.regions {
        let role = match region.kind {
            RegionKind::Text => StructRole::P,
            RegionKind::Image => StructRole::Figure,
        };
        let element = tree.create_element(doc, &role, parent, Some(page))?;
        StructTree::append_kid(doc, element, Object::Integer(i64::from(region.mcid)))?;
    }
    Ok(tagged.regions.len())
}

fn tag_document(doc: &mut PdfDocument, result: &mut ProcessorResult) -> Result<usize, PdfError> {
    let tree = StructTree::ensure(doc)?;
    ensure_mark_info(doc)?;
    let document = tree.ensure_document_element(doc)?;

    let mut created = 0;
    for index in 0..doc.page_count() {
        let page = doc.page_id(index)?;
        doc.page_dict_mut(index)?
            .set("Tabs", Object::Name(b"S".to_vec()));

        let ops = match doc.page_operators(index) {
            Ok(ops) => ops,
            Err(e) => {
                warn!(page = index + 1, error = %e, "skipping page with unparsable content");
                result.warn(format!(
                    "Page {}: content stream could not be parsed, page left untagged",
                    index + 1
                ));
                continue;
            }
        };
        let tagged = tag_content(&ops, |name| is_image(doc, index, name), next_mcid(&ops));
        if tagged.is_unchanged() {
            continue;
        }
        doc.set_page_content(index, &tagged.ops)?;
        let added = add_region_elements(doc, &tree, document, page, &tagged)?;
        debug!(page = index + 1, regions = added, "tagged page");
        created += added;
    }

    merge_parent_tree(doc, &tree)?;
    Ok(created)
}

fn tag_untagged_images(doc: &mut PdfDocument, result: &mut ProcessorResult) -> Result<usize, PdfError> {
    let Some(tree) = StructTree::find(doc) else {
        return Ok(0);
    };
    let document = tree.ensure_document_element(doc)?;

    let mut created = 0;
    for index in 0..doc.page_count() {
        if doc.image_xobjects(index)?.is_empty() {
            continue;
        }
        let ops = match doc.page_operators(index) {
            Ok(ops) => ops,
            Err(e) => {
                debug!(page = index + 1, error = %e, "cannot scan page for untagged images");
                result.warn(format!(
                    "Page {}: content stream could not be parsed, images left untagged",
                    index + 1
                ));
                continue;
            }
        };
        let tagged = wrap_do_invocations(&ops, next_mcid(&ops), |name, enclosing| {
            enclosing.is_empty() && is_image(doc, index, name)
        });
        if tagged.is_unchanged() {
            continue;
        }
        let page = doc.page_id(index)?;
        doc.set_page_content(index, &tagged.ops)?;
        created += add_region_elements(doc, &tree, document, page, &tagged)?;
    }

    if created > 0 {
        merge_parent_tree(doc, &tree)?;
    }
    Ok(created)
}
