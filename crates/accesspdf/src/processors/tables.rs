//! Synthesize table structure from ruled grids.
//!
//! A page whose ruling lines form at least a 2x2 grid gets a `Table`
//! element with one `TR` per row and one cell per column. The first row
//! holds `TH` cells with an `/ID` and a column scope; the other rows hold
//! `TD` cells whose `/Headers` name their column's header. Cells are not
//! linked to content.

use accesspdf_core::{DEFAULT_GRID_TOLERANCE, PdfError, ProcessorResult, StructRole, TableGrid, find_grid};
use accesspdf_parse::PdfDocument;
use accesspdf_parse::replay::ruling_segments;
use lopdf::{Object, ObjectId, dictionary};
use tracing::debug;

use super::Processor;
use crate::config::Config;
use crate::struct_tree::StructTree;

pub struct TablesProcessor;

impl Processor for TablesProcessor {
    fn name(&self) -> &'static str {
        "Tables"
    }

    fn process(&self, doc: &mut PdfDocument, _config: &Config) -> Result<ProcessorResult, PdfError> {
        let mut result = ProcessorResult::new(self.name());
        let Some(tree) = StructTree::find(doc) else {
            return Ok(result);
        };
        if tree.contains_role(doc, &StructRole::Table) {
            return Ok(result);
        }

        let grids = detect_grids(doc);
        if grids.is_empty() {
            return Ok(result);
        }
        let document = tree.ensure_document_element(doc)?;
        for (n, grid) in grids.iter().enumerate() {
            build_table(doc, &tree, document, grid, n + 1)?;
        }

        result.warn(format!(
            "Detected {} table(s) with structural tags only. \
             Cell content is not linked -- manual review recommended.",
            grids.len()
        ));
        Ok(result.with_changes(grids.len()))
    }
}

/// At most one grid per page.
fn detect_grids(doc: &PdfDocument) -> Vec<TableGrid> {
    (0..doc.page_count())
        .filter_map(|index| {
            let ops = doc.page_operators(index).ok()?;
            find_grid(&ruling_segments(&ops), index, DEFAULT_GRID_TOLERANCE)
        })
        .collect()
}

fn build_table(
    doc: &mut PdfDocument,
    tree: &StructTree,
    document: ObjectId,
    grid: &TableGrid,
    number: usize,
) -> Result<ObjectId, PdfError> {
    let page = doc.page_id(grid.page_index)?;
    let table = tree.create_element(doc, &StructRole::Table, document, Some(page))?;
    let header_ids: Vec<String> = (1..=grid.col_count())
        .map(|col| format!("t{number}_c{col}"))
        .collect();

    for row in 0..grid.row_count() {
        let tr = tree.create_element(doc, &StructRole::TR, table, Some(page))?;
        for header_id in &header_ids {
            if row == 0 {
                let th = tree.create_element(doc, &StructRole::TH, tr, Some(page))?;
                let cell = doc.dict_mut(th)?;
                cell.set("ID", Object::string_literal(header_id.as_str()));
                cell.set("A", dictionary! { "O" => "Table", "Scope" => "Column" });
            } else {
                let td = tree.create_element(doc, &StructRole::TD, tr, Some(page))?;
                doc.dict_mut(td)?.set(
                    "Headers",
                    vec![Object::string_literal(header_id.as_str())],
                );
            }
        }
    }
    debug!(
        page = grid.page_index + 1,
        rows = grid.row_count(),
        cols = grid.col_count(),
        "created table structure"
    );
    Ok(table)
}
