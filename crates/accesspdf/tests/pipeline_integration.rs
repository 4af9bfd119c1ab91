//! End-to-end remediation through `Pipeline::run`.

mod common;

use accesspdf::accesspdf_core::{AltTextStatus, StructRole};
use accesspdf::alttext::SidecarStore;
use accesspdf::pipeline::INJECTOR_NAME;
use accesspdf::{Config, PdfDocument, PdfError, Pipeline, StructTree, analyze, inject_file};
use accesspdf::accesspdf_parse::dict_string;
use lopdf::Object;

use common::*;

fn catalog_lang(doc: &PdfDocument) -> Option<String> {
    dict_string(doc.inner(), doc.catalog().unwrap(), b"Lang")
}

fn is_marked(doc: &PdfDocument) -> bool {
    let catalog = doc.catalog().unwrap();
    let mark_info = doc.resolve_dict(catalog.get(b"MarkInfo").unwrap()).unwrap();
    matches!(mark_info.get(b"Marked"), Ok(Object::Boolean(true)))
}

#[test]
fn three_paragraphs_become_tagged_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "memo.pdf", &three_paragraphs());
    let output = dir.path().join("memo_accessible.pdf");

    let result = Pipeline::default().run(&input, &output, None).unwrap();
    assert!(result.all_succeeded(), "{:?}", result.processor_results);

    let doc = PdfDocument::load(&output).unwrap();
    assert!(StructTree::is_tagged(&doc));
    assert!(is_marked(&doc));
    assert_eq!(catalog_lang(&doc).as_deref(), Some("en-US"));
    assert!(with_role(&doc, StructRole::P).len() >= 3);
    assert!(with_role(&doc, StructRole::Figure).is_empty());
    assert!(with_role(&doc, StructRole::Table).is_empty());
    assert!(with_role(&doc, StructRole::Link).is_empty());

    let sidecar_path = result.sidecar_path.clone().unwrap();
    assert_eq!(sidecar_path, dir.path().join("memo_accessible.alttext.yaml"));
    let sidecar = SidecarStore::load(&sidecar_path).unwrap();
    assert!(sidecar.images.is_empty());

    let tree = StructTree::find(&doc).unwrap();
    assert!(tree.check_well_formed(&doc).is_empty());
}

#[test]
fn ruled_table_gets_table_structure() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "table.pdf", &ruled_table(4, 3));
    let output = dir.path().join("table_out.pdf");
    Pipeline::default().run(&input, &output, None).unwrap();

    let doc = PdfDocument::load(&output).unwrap();
    assert_eq!(with_role(&doc, StructRole::Table).len(), 1);
    assert!(with_role(&doc, StructRole::TR).len() >= 4);

    let headers = with_role(&doc, StructRole::TH);
    assert!(headers.len() >= 3);
    for th in &headers {
        let dict = doc.dict(th.id).unwrap();
        assert!(dict_string(doc.inner(), dict, b"ID").is_some_and(|id| !id.is_empty()));
        let attrs = doc.resolve_dict(dict.get(b"A").unwrap()).unwrap();
        assert_eq!(attrs.get(b"Scope").unwrap().as_name().unwrap(), b"Column");
    }

    let cells = with_role(&doc, StructRole::TD);
    assert!(cells.len() >= 3);
    for td in &cells {
        let dict = doc.dict(td.id).unwrap();
        let headers = doc.resolve(dict.get(b"Headers").unwrap()).as_array().unwrap();
        assert!(!headers.is_empty());
    }
}

#[test]
fn input_file_is_never_modified() {
    let dir = tempfile::tempdir().unwrap();
    let original = three_images();
    let input = write(dir.path(), "figures.pdf", &original);
    let output = dir.path().join("out").join("figures_fixed.pdf");

    Pipeline::default().run(&input, &output, None).unwrap();
    assert_eq!(std::fs::read(&input).unwrap(), original);
    assert!(output.is_file());
    assert!(!dir.path().join("figures.alttext.yaml").exists());
}

#[test]
fn same_input_and_output_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let original = three_paragraphs();
    let input = write(dir.path(), "memo.pdf", &original);

    let err = Pipeline::default().run(&input, &input, None).unwrap_err();
    assert!(matches!(err, PdfError::SameInputOutput { .. }));
    assert_eq!(std::fs::read(&input).unwrap(), original);
}

#[test]
fn second_run_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "report.pdf", &report_with_heading());
    let first_out = dir.path().join("first.pdf");
    let second_out = dir.path().join("second.pdf");
    let pipeline = Pipeline::new(Config::default());

    let first = pipeline.run(&input, &first_out, None).unwrap();
    assert!(first.total_changes() > 0);
    let doc = PdfDocument::load(&first_out).unwrap();
    assert_eq!(with_role(&doc, StructRole::H(1)).len(), 1);

    let second = pipeline.run(&first_out, &second_out, None).unwrap();
    for result in &second.processor_results {
        assert!(result.success, "{result:?}");
        assert_eq!(result.changes_made, 0, "{} changed again", result.processor_name);
    }
}

#[test]
fn image_hashes_survive_remediation() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "figures.pdf", &three_images());
    let output = dir.path().join("figures_out.pdf");

    let before: Vec<String> = analyze(&PdfDocument::load(&input).unwrap())
        .images
        .into_iter()
        .map(|i| i.hash)
        .collect();
    let result = Pipeline::default().run(&input, &output, None).unwrap();
    let sidecar = SidecarStore::load(result.sidecar_path.as_ref().unwrap()).unwrap();
    let after: Vec<String> = sidecar.images.iter().map(|e| e.hash.clone()).collect();
    assert_eq!(before.len(), 3);
    assert_eq!(before, after);
}

/// Remediate the three-image fixture and mark its entries approved "X",
/// decorative and needs_review. Returns the remediated path and the
/// reviewed sidecar path.
fn reviewed_three_images(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let input = write(dir, "figures.pdf", &three_images());
    let remediated = dir.join("figures_accessible.pdf");
    let result = Pipeline::default().run(&input, &remediated, None).unwrap();

    let mut sidecar = SidecarStore::load(result.sidecar_path.as_ref().unwrap()).unwrap();
    assert_eq!(sidecar.images.len(), 3);
    sidecar.images[0].status = AltTextStatus::Approved;
    sidecar.images[0].alt_text = "X".to_string();
    sidecar.images[1].status = AltTextStatus::Decorative;
    let reviewed = dir.join("reviewed.alttext.yaml");
    SidecarStore::save(&sidecar, &reviewed).unwrap();
    (remediated, reviewed)
}

#[test]
fn reviewed_alt_text_is_injected() {
    let dir = tempfile::tempdir().unwrap();
    let (remediated, reviewed) = reviewed_three_images(dir.path());
    let injected = dir.path().join("figures_final.pdf");

    let report = inject_file(&remediated, &reviewed, &injected).unwrap();
    assert_eq!(report.injected(), 2);
    assert!(report.unmatched.is_empty());

    let doc = PdfDocument::load(&injected).unwrap();
    let figures = with_role(&doc, StructRole::Figure);
    assert_eq!(figures.len(), 3);
    let approved: Vec<_> = figures
        .iter()
        .filter(|f| f.alt_text.as_deref() == Some("X"))
        .collect();
    assert_eq!(approved.len(), 1);
    let decorative: Vec<_> = figures
        .iter()
        .filter(|f| f.alt_text.as_deref() == Some("") && f.actual_text.as_deref() == Some(""))
        .collect();
    assert_eq!(decorative.len(), 1);
    assert_eq!(figures.iter().filter(|f| f.alt_text.is_none()).count(), 1);

    let again = dir.path().join("figures_again.pdf");
    let rerun = inject_file(&injected, &reviewed, &again).unwrap();
    assert_eq!(rerun.created, 0);
    let doc = PdfDocument::load(&again).unwrap();
    assert_eq!(with_role(&doc, StructRole::Figure).len(), 3);
}

#[test]
fn pipeline_runs_injection_from_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let (_, reviewed) = reviewed_three_images(dir.path());
    let input = dir.path().join("figures.pdf");
    let output = dir.path().join("figures_with_alt.pdf");

    let result = Pipeline::default().run(&input, &output, Some(&reviewed)).unwrap();
    let injector = result.processor(INJECTOR_NAME).unwrap();
    assert!(injector.success);
    assert_eq!(injector.changes_made, 2);

    let analysis = analyze(&PdfDocument::load(&output).unwrap());
    assert!(analysis.is_tagged);
    assert_eq!(analysis.figures_without_alt, 1);
}
