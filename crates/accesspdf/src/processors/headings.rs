//! Promote paragraphs to headings from font-size statistics.

use accesspdf_core::{HeadingMap, PdfError, ProcessorResult, StructRole, TextRun, nesting_warnings};
use accesspdf_parse::PdfDocument;
use accesspdf_parse::replay::text_runs;
use tracing::debug;

use super::Processor;
use crate::config::Config;
use crate::mcid_text::McidTextCache;
use crate::struct_tree::StructTree;

pub struct HeadingsProcessor;

impl Processor for HeadingsProcessor {
    fn name(&self) -> &'static str {
        "Headings"
    }

    fn process(&self, doc: &mut PdfDocument, _config: &Config) -> Result<ProcessorResult, PdfError> {
        let mut result = ProcessorResult::new(self.name());
        let Some(tree) = StructTree::find(doc) else {
            return Ok(result);
        };

        let map = HeadingMap::from_runs(&document_runs(doc));
        if map.is_empty() {
            return Ok(result);
        }

        let mut cache = McidTextCache::new();
        let mut promoted = 0;
        for element in tree.elements(doc) {
            if element.role != StructRole::P {
                continue;
            }
            let text = cache.element_text(doc, &element);
            if let Some(level) = map.match_text(&text) {
                StructTree::set_role(doc, element.id, &StructRole::heading(level))?;
                debug!(level, text = %text, "promoted paragraph to heading");
                promoted += 1;
            }
        }

        let levels: Vec<u8> = tree
            .elements(doc)
            .iter()
            .filter_map(|e| e.role.heading_level())
            .collect();
        for warning in nesting_warnings(&levels) {
            result.warn(warning);
        }
        Ok(result.with_changes(promoted))
    }
}

/// Text runs of every parseable page, with fonts resolved to `/BaseFont`.
pub(crate) fn document_runs(doc: &PdfDocument) -> Vec<TextRun> {
    let mut runs = Vec::new();
    for index in 0..doc.page_count() {
        let ops = match doc.page_operators(index) {
            Ok(ops) => ops,
            Err(e) => {
                debug!(page = index + 1, error = %e, "no text runs for unparsable page");
                continue;
            }
        };
        runs.extend(
            text_runs(&ops, index, |resource| doc.font_base_name(index, resource))
                .into_iter()
                .map(|positioned| positioned.run),
        );
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::TaggerProcessor;
    use crate::test_support::text_pdf;

    fn tag_then_promote(contents: &[&[u8]]) -> (PdfDocument, ProcessorResult) {
        let mut doc = text_pdf(contents);
        let config = Config::default();
        TaggerProcessor.process(&mut doc, &config).unwrap();
        let result = HeadingsProcessor.process(&mut doc, &config).unwrap();
        (doc, result)
    }

    fn roles(doc: &PdfDocument) -> Vec<StructRole> {
        StructTree::find(doc)
            .unwrap()
            .elements(doc)
            .into_iter()
            .skip(1)
            .map(|e| e.role)
            .collect()
    }

    fn body(n: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for i in 0..n {
            out.extend_from_slice(
                format!("BT /F1 12 Tf 72 {} Td (Body line number {i}) Tj ET ", 600 - i * 14).as_bytes(),
            );
        }
        out
    }

    #[test]
    fn larger_sizes_become_ranked_headings() {
        let mut content = b"BT /F1 24 Tf 72 760 Td (Main Title) Tj ET \
                            BT /F1 18 Tf 72 730 Td (Section One) Tj ET "
            .to_vec();
        content.extend(body(5));
        let (doc, result) = tag_then_promote(&[&content]);
        assert_eq!(result.changes_made, 2);
        assert!(result.warnings.is_empty());
        let roles = roles(&doc);
        assert_eq!(roles[0], StructRole::H(1));
        assert_eq!(roles[1], StructRole::H(2));
        assert!(roles[2..].iter().all(|r| *r == StructRole::P));
    }

    #[test]
    fn text_matrix_scale_counts_toward_size() {
        let mut content = b"BT /F1 12 Tf 2 0 0 2 72 760 Tm (Scaled Title) Tj ET ".to_vec();
        content.extend(body(4));
        let (doc, result) = tag_then_promote(&[&content]);
        assert_eq!(result.changes_made, 1);
        assert_eq!(roles(&doc)[0], StructRole::H(1));
    }

    #[test]
    fn bold_runs_fall_back_to_level_two() {
        let mut content = b"BT /F2 12 Tf 72 760 Td (Bold Heading) Tj ET ".to_vec();
        content.extend(body(4));
        let (doc, result) = tag_then_promote(&[&content]);
        assert_eq!(result.changes_made, 1);
        assert_eq!(roles(&doc)[0], StructRole::H(2));
    }

    #[test]
    fn skipped_levels_are_warned_about() {
        let mut content = b"BT /F1 30 Tf 72 760 Td (Top) Tj ET \
                            BT /F1 24 Tf 72 740 Td (Unused size) Tj ET \
                            BT /F1 18 Tf 72 720 Td (Deep) Tj ET "
            .to_vec();
        content.extend(body(6));
        let mut doc = text_pdf(&[&content]);
        let config = Config::default();
        TaggerProcessor.process(&mut doc, &config).unwrap();
        // Keep the middle heading as a paragraph by renaming it first.
        let tree = StructTree::find(&doc).unwrap();
        let middle = tree.elements(&doc)[2].id;
        StructTree::set_role(&mut doc, middle, &StructRole::Other("Span".into())).unwrap();
        let result = HeadingsProcessor.process(&mut doc, &config).unwrap();
        assert_eq!(result.changes_made, 2);
        assert_eq!(result.warnings, vec!["Heading nesting skip: H1 -> H3".to_string()]);
    }

    #[test]
    fn second_run_promotes_nothing() {
        let mut content = b"BT /F1 24 Tf 72 760 Td (Title) Tj ET ".to_vec();
        content.extend(body(4));
        let (mut doc, first) = tag_then_promote(&[&content]);
        assert_eq!(first.changes_made, 1);
        let again = HeadingsProcessor.process(&mut doc, &Config::default()).unwrap();
        assert_eq!(again.changes_made, 0);
    }

    #[test]
    fn uniform_text_has_no_headings() {
        let (doc, result) = tag_then_promote(&[&body(3)]);
        assert_eq!(result.changes_made, 0);
        assert!(roles(&doc).iter().all(|r| *r == StructRole::P));
    }
}
