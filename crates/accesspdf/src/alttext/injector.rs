//! Write reviewed sidecar alt text into the structure tree.
//!
//! Two passes. Existing `Figure` elements without alt text are matched to
//! a pending entry, first through the image their own marked content
//! draws, then through the page when exactly one pending image is drawn
//! there. Entries still pending afterwards get a new `Figure`: each `Do`
//! of the image outside any `Figure` region is wrapped in a fresh
//! `/Figure <</MCID n>> BDC ... EMC` and the parent tree is merged.
//!
//! Only approved and decorative entries are written. An image already
//! inside a `Figure` region is never wrapped again, so re-running the
//! injector does not duplicate tags.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use accesspdf_core::{AltTextEntry, AltTextStatus, PdfError, SidecarFile, StructRole};
use accesspdf_parse::regions::wrap_do_invocations;
use accesspdf_parse::replay::mcid_xobjects;
use accesspdf_parse::{PdfDocument, next_mcid};
use lopdf::{Object, ObjectId};
use tracing::{debug, info, warn};

use crate::parent_tree::merge_parent_tree;
use crate::struct_tree::{StructElement, StructTree};

/// Outcome of one injection run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InjectionReport {
    /// Existing `Figure` elements that received alt text.
    pub matched_existing: usize,
    /// Entries written through newly created `Figure` elements.
    pub created: usize,
    /// Ids of actionable entries whose image was not found.
    pub unmatched: Vec<String>,
    pub warnings: Vec<String>,
}

impl InjectionReport {
    /// Number of sidecar entries written into the document.
    pub fn injected(&self) -> usize {
        self.matched_existing + self.created
    }
}

/// Alt text waiting to be written, keyed by image hash.
#[derive(Debug, Clone)]
struct Pending {
    id: String,
    alt: String,
    decorative: bool,
}

impl Pending {
    fn from_entry(entry: &AltTextEntry) -> Option<Self> {
        Some(Self {
            id: entry.id.clone(),
            alt: entry.resolved_alt_text()?.to_string(),
            decorative: entry.status == AltTextStatus::Decorative,
        })
    }

    fn apply(&self, doc: &mut PdfDocument, figure: ObjectId) -> Result<(), PdfError> {
        if self.decorative {
            StructTree::set_alt_text(doc, figure, "")?;
            StructTree::set_actual_text(doc, figure, "")
        } else {
            StructTree::set_alt_text(doc, figure, &self.alt)
        }
    }
}

/// Inject the sidecar's approved and decorative entries into `doc`.
pub fn inject_alt_text(doc: &mut PdfDocument, sidecar: &SidecarFile) -> Result<InjectionReport, PdfError> {
    let mut report = InjectionReport::default();
    let mut pending: BTreeMap<String, Pending> = BTreeMap::new();
    for entry in sidecar.actionable() {
        match Pending::from_entry(entry) {
            Some(p) => {
                pending.entry(entry.hash.clone()).or_insert(p);
            }
            None => report
                .warnings
                .push(format!("{}: approved entry has no alt text, skipped", entry.id)),
        }
    }
    if pending.is_empty() {
        info!("no approved or decorative alt text entries to inject");
        return Ok(report);
    }

    let Some(tree) = StructTree::find(doc) else {
        warn!("document has no structure tree, alt text not injected");
        report
            .warnings
            .push("PDF has no structure tree; alt text was not injected".to_string());
        report.unmatched = pending.into_values().map(|p| p.id).collect();
        return Ok(report);
    };

    report.matched_existing = match_existing(doc, &tree, &mut pending)?;
    if !pending.is_empty() {
        report.created = create_figures(doc, &tree, &mut pending, &mut report.warnings)?;
    }

    for p in pending.into_values() {
        report
            .warnings
            .push(format!("{}: image not found in document", p.id));
        report.unmatched.push(p.id);
    }
    info!(
        matched = report.matched_existing,
        created = report.created,
        "injected alt text"
    );
    Ok(report)
}

/// A `Figure` still waiting for alt text. Decorative figures carry an
/// empty `/Alt` together with an empty `/ActualText`.
fn needs_alt(element: &StructElement) -> bool {
    if element.role != StructRole::Figure || element.has_alt_text() {
        return false;
    }
    !(element.alt_text.is_some() && element.actual_text.as_deref() == Some(""))
}

/// Resource name to hash of each image listed directly on a page.
fn image_names(doc: &PdfDocument, index: usize) -> Result<HashMap<String, String>, PdfError> {
    Ok(doc
        .image_xobjects(index)?
        .into_iter()
        .map(|img| (img.name, img.hash))
        .collect())
}

fn match_existing(
    doc: &mut PdfDocument,
    tree: &StructTree,
    pending: &mut BTreeMap<String, Pending>,
) -> Result<usize, PdfError> {
    let figures: Vec<(StructElement, usize)> = tree
        .elements(doc)
        .into_iter()
        .filter(needs_alt)
        .filter_map(|e| {
            let index = e.owning_page(doc).and_then(|p| doc.page_index(p))?;
            Some((e, index))
        })
        .collect();

    let mut matched = 0;
    let mut unresolved = Vec::new();
    let mut drawn: HashMap<usize, BTreeMap<u32, Vec<String>>> = HashMap::new();
    for (figure, index) in figures {
        let regions = drawn.entry(index).or_insert_with(|| {
            doc.page_operators(index)
                .map(|ops| mcid_xobjects(&ops))
                .unwrap_or_default()
        });
        let names = image_names(doc, index)?;
        let own = figure
            .mcids()
            .into_iter()
            .filter(|(_, pg)| pg.and_then(|p| doc.page_index(p)).is_none_or(|i| i == index))
            .filter_map(|(mcid, _)| regions.get(&mcid))
            .flatten()
            .filter_map(|name| names.get(name))
            .find(|hash| pending.contains_key(*hash))
            .cloned();
        match own.and_then(|hash| pending.remove(&hash)) {
            Some(entry) => {
                entry.apply(doc, figure.id)?;
                debug!(id = %entry.id, page = index + 1, "matched figure by its content");
                matched += 1;
            }
            None => unresolved.push((figure, index)),
        }
    }

    for (figure, index) in unresolved {
        let candidates: Vec<String> = doc
            .page_image_hashes(index)?
            .into_iter()
            .filter(|h| pending.contains_key(h))
            .collect();
        let [hash] = candidates.as_slice() else {
            continue;
        };
        if let Some(entry) = pending.remove(hash) {
            entry.apply(doc, figure.id)?;
            debug!(id = %entry.id, page = index + 1, "matched figure by page");
            matched += 1;
        }
    }
    Ok(matched)
}

fn create_figures(
    doc: &mut PdfDocument,
    tree: &StructTree,
    pending: &mut BTreeMap<String, Pending>,
    warnings: &mut Vec<String>,
) -> Result<usize, PdfError> {
    let document = tree.ensure_document_element(doc)?;
    let mut consumed = 0;
    for index in 0..doc.page_count() {
        if pending.is_empty() {
            break;
        }
        let wanted: HashMap<String, String> = image_names(doc, index)?
            .into_iter()
            .filter(|(_, hash)| pending.contains_key(hash))
            .collect();
        if wanted.is_empty() {
            continue;
        }
        let ops = match doc.page_operators(index) {
            Ok(ops) => ops,
            Err(e) => {
                warnings.push(format!(
                    "Page {}: content stream could not be parsed, images left untagged",
                    index + 1
                ));
                debug!(page = index + 1, error = %e, "cannot wrap images");
                continue;
            }
        };
        let tagged = wrap_do_invocations(&ops, next_mcid(&ops), |name, enclosing| {
            wanted.contains_key(name) && !enclosing.iter().any(|tag| tag == "Figure")
        });
        if tagged.is_unchanged() {
            continue;
        }
        doc.set_page_content(index, &tagged.ops)?;

        let page = doc.page_id(index)?;
        let mut used = BTreeSet::new();
        for region in &tagged.regions {
            let Some(hash) = region.xobject.as_ref().and_then(|n| wanted.get(n)) else {
                continue;
            };
            let Some(entry) = pending.get(hash) else {
                continue;
            };
            let figure = tree.create_element(doc, &StructRole::Figure, document, Some(page))?;
            StructTree::append_kid(doc, figure, Object::Integer(i64::from(region.mcid)))?;
            entry.apply(doc, figure)?;
            used.insert(hash.clone());
        }
        for hash in used {
            if let Some(entry) = pending.remove(&hash) {
                debug!(id = %entry.id, page = index + 1, "created figure");
                consumed += 1;
            }
        }
    }
    if consumed > 0 {
        merge_parent_tree(doc, tree)?;
    }
    Ok(consumed)
}
