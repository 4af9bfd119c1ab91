//! Integration tests for the accesspdf subcommands.

mod common;

use common::{cmd, write_pdf};
use predicates::prelude::*;

const BODY: &str = "The quarterly report describes the results of the team";

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("fix"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("inject"))
        .stdout(predicate::str::contains("alt-text"));
}

#[test]
fn check_reports_untagged_document() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "plain.pdf", BODY, false);
    cmd()
        .arg("check")
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("Tagged:  no"))
        .stdout(predicate::str::contains("[ERROR] tagged-pdf"))
        .stdout(predicate::str::contains("[ERROR] document-lang"));
}

#[test]
fn check_json_is_parseable() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "img.pdf", BODY, true);
    let output = cmd()
        .args(["check", "--format", "json"])
        .arg(&pdf)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["analysis"]["page_count"], 1);
    assert_eq!(json["analysis"]["is_tagged"], false);
    assert_eq!(json["analysis"]["images"].as_array().unwrap().len(), 1);
}

#[test]
fn missing_file_exits_1() {
    cmd()
        .args(["check", "/nonexistent/file.pdf"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn invalid_pdf_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.pdf");
    std::fs::write(&bad, b"not a pdf at all").unwrap();
    cmd().arg("fix").arg(&bad).assert().code(1);
}

#[test]
fn fix_writes_default_output_and_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "report.pdf", BODY, true);
    let before = std::fs::read(&pdf).unwrap();

    cmd()
        .arg("fix")
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("TagStructure"))
        .stdout(predicate::str::contains("Bookmarks"));

    assert!(dir.path().join("report_accessible.pdf").is_file());
    let sidecar = std::fs::read_to_string(dir.path().join("report_accessible.alttext.yaml")).unwrap();
    assert!(sidecar.contains("status: needs_review"));
    assert_eq!(std::fs::read(&pdf).unwrap(), before);

    cmd()
        .arg("check")
        .arg(dir.path().join("report_accessible.pdf"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Tagged:  yes"));
}

#[test]
fn fix_refuses_to_overwrite_input() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "report.pdf", BODY, false);
    cmd()
        .arg("fix")
        .arg(&pdf)
        .arg("-o")
        .arg(&pdf)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("over the input file"));
}

#[test]
fn inject_writes_approved_text() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "report.pdf", BODY, true);
    let fixed = dir.path().join("fixed.pdf");
    cmd().arg("fix").arg(&pdf).arg("-o").arg(&fixed).assert().success();

    let sidecar = dir.path().join("fixed.alttext.yaml");
    let text = std::fs::read_to_string(&sidecar)
        .unwrap()
        .replace("status: needs_review", "status: approved")
        .replace("alt_text: ''", "alt_text: A checkerboard");
    std::fs::write(&sidecar, text).unwrap();

    cmd()
        .arg("inject")
        .arg(&fixed)
        .arg("--sidecar")
        .arg(&sidecar)
        .arg("-o")
        .arg(dir.path().join("final.pdf"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Injected 1 alt text(s)"));

    cmd()
        .args(["alt-text", "stats"])
        .arg(&sidecar)
        .assert()
        .success()
        .stdout(predicate::str::contains("approved:     1"));
}

#[test]
fn batch_reports_failures_with_exit_2() {
    let dir = tempfile::tempdir().unwrap();
    write_pdf(dir.path(), "one.pdf", BODY, false);
    write_pdf(dir.path(), "two.pdf", BODY, true);
    std::fs::write(dir.path().join("broken.pdf"), b"garbage").unwrap();

    cmd()
        .arg("batch")
        .arg(dir.path())
        .args(["--workers", "2"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Succeeded: 2"))
        .stdout(predicate::str::contains("Failed: 1"));
    assert!(dir.path().join("accessible/one_accessible.pdf").is_file());
    assert!(dir.path().join("accessible/two_accessible.pdf").is_file());
}

#[test]
fn batch_of_good_files_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    write_pdf(dir.path(), "one.pdf", BODY, false);
    let out = dir.path().join("out");
    cmd()
        .arg("batch")
        .arg(dir.path())
        .arg("-o")
        .arg(&out)
        .assert()
        .success();
    assert!(out.join("one_accessible.pdf").is_file());
}

#[test]
fn alt_text_generate_with_noop_provider() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "pic.pdf", BODY, true);
    cmd()
        .args(["alt-text", "generate"])
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("using noop"));
    assert!(dir.path().join("pic.alttext.yaml").is_file());
}

#[test]
fn unknown_provider_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "pic.pdf", BODY, true);
    let config = dir.path().join("custom.yaml");
    std::fs::write(&config, "ai:\n  provider: mystery\n").unwrap();
    cmd()
        .arg("--config")
        .arg(&config)
        .args(["alt-text", "generate"])
        .arg(&pdf)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown alt-text provider"));
}
