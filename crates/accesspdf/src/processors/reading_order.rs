//! Reorder the `Document` element's children into reading order.
//!
//! Each child is placed by page, then top to bottom, then left to right.
//! Positions come from replaying the page up to the child's first MCID;
//! links use their annotation rectangle. Children without a position sort
//! after the positioned ones on their page, in MCID order. Columns are
//! not detected.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use accesspdf_core::geometry::Point;
use accesspdf_core::{PdfError, ProcessorResult};
use accesspdf_parse::PdfDocument;
use accesspdf_parse::replay::mcid_positions;
use lopdf::Object;
use tracing::debug;

use super::Processor;
use crate::config::Config;
use crate::struct_tree::{Kid, StructElement, StructTree};

pub struct ReadingOrderProcessor;

impl Processor for ReadingOrderProcessor {
    fn name(&self) -> &'static str {
        "ReadingOrder"
    }

    fn process(&self, doc: &mut PdfDocument, _config: &Config) -> Result<ProcessorResult, PdfError> {
        let result = ProcessorResult::new(self.name());
        let Some(tree) = StructTree::find(doc) else {
            return Ok(result);
        };
        let Some(document) = tree.document_element(doc) else {
            return Ok(result);
        };
        let kids = StructTree::raw_kids(doc, document);
        if kids.len() < 2 {
            return Ok(result);
        }

        let mut positions = PositionCache::default();
        let mut keyed: Vec<(OrderKey, usize)> = kids
            .iter()
            .enumerate()
            .map(|(i, kid)| (order_key(doc, kid, &mut positions), i))
            .collect();
        keyed.sort_by(|a, b| a.0.compare(&b.0).then(a.1.cmp(&b.1)));

        if keyed.iter().enumerate().all(|(i, (_, original))| i == *original) {
            return Ok(result);
        }
        let reordered: Vec<Object> = keyed.iter().map(|(_, i)| kids[*i].clone()).collect();
        StructTree::set_raw_kids(doc, document, reordered)?;
        debug!(children = kids.len(), "reordered document children");
        Ok(result.with_changes(1))
    }
}

/// Sort key of one child of the `Document` element.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderKey {
    page: usize,
    position: Option<Point>,
    mcid: u32,
}

impl OrderKey {
    fn unplaced() -> Self {
        Self {
            page: usize::MAX,
            position: None,
            mcid: u32::MAX,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.page.cmp(&other.page).then_with(|| {
            match (self.position, other.position) {
                (Some(a), Some(b)) => b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => self.mcid.cmp(&other.mcid),
            }
        })
    }
}

/// MCID positions per page, replayed once per page.
#[derive(Debug, Default)]
struct PositionCache {
    pages: HashMap<usize, BTreeMap<u32, Point>>,
}

impl PositionCache {
    fn get(&mut self, doc: &PdfDocument, page: usize, mcid: u32) -> Option<Point> {
        self.pages
            .entry(page)
            .or_insert_with(|| {
                doc.page_operators(page)
                    .map(|ops| mcid_positions(&ops))
                    .unwrap_or_default()
            })
            .get(&mcid)
            .copied()
    }
}

fn order_key(doc: &PdfDocument, kid: &Object, positions: &mut PositionCache) -> OrderKey {
    let Some(element) = kid
        .as_reference()
        .ok()
        .and_then(|id| StructElement::load(doc, id).ok())
    else {
        return OrderKey::unplaced();
    };
    let Some(page) = element.owning_page(doc).and_then(|p| doc.page_index(p)) else {
        return OrderKey::unplaced();
    };

    let first_mcid = element
        .mcids()
        .into_iter()
        .find(|(_, pg)| pg.and_then(|p| doc.page_index(p)) == Some(page))
        .map(|(mcid, _)| mcid);

    let position = first_mcid
        .and_then(|mcid| positions.get(doc, page, mcid))
        .or_else(|| annotation_position(doc, &element));

    OrderKey {
        page,
        position,
        mcid: first_mcid.unwrap_or(u32::MAX),
    }
}

/// Top-left corner of the first annotation an element references.
fn annotation_position(doc: &PdfDocument, element: &StructElement) -> Option<Point> {
    element.kids.iter().find_map(|kid| match kid {
        Kid::ObjectRef { obj, .. } => {
            let annot = doc.dict(*obj).ok()?;
            let [x0, _, _, y1] = doc.rect(annot.get(b"Rect").ok()?)?;
            Some(Point::new(x0, y1))
        }
        _ => None,
    })
}
