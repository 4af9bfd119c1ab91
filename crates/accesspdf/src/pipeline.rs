//! Remediation of a single document.
//!
//! The input file is only ever read. Every pass runs against one
//! in-memory copy, in the fixed order of [`default_processors`]; a pass
//! that errors or panics is recorded as failed and the remaining passes
//! still run. The result is written to a distinct output path together
//! with the output's alt-text sidecar.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use accesspdf_core::{PdfError, ProcessorResult, RemediationResult};
use accesspdf_parse::PdfDocument;
use tracing::{debug, error, info, warn};

use crate::alttext::{InjectionReport, SidecarStore, inject_alt_text};
use crate::config::Config;
use crate::processors::{Processor, default_processors};

/// Name recorded for the injection step.
pub const INJECTOR_NAME: &str = "AltTextInjector";

/// `<dir>/<stem><suffix>.pdf` next to `input`.
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}{suffix}.pdf"))
}

/// An ordered list of passes plus the configuration they run with.
pub struct Pipeline {
    config: Config,
    processors: Vec<Box<dyn Processor>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            processors: default_processors(),
        }
    }

    /// A pipeline running `processors` instead of the default passes.
    pub fn with_processors(config: Config, processors: Vec<Box<dyn Processor>>) -> Self {
        Self { config, processors }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Pass names in execution order.
    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run every pass over `doc` in memory.
    pub fn remediate(&self, doc: &mut PdfDocument) -> Vec<ProcessorResult> {
        self.processors
            .iter()
            .map(|p| run_isolated(p.as_ref(), doc, &self.config))
            .collect()
    }

    /// Remediate `input` into `output`, write the output's sidecar, and
    /// when `alt_text` names a sidecar inject its reviewed entries.
    ///
    /// # Errors
    ///
    /// [`PdfError::SameInputOutput`] when both paths name the same file,
    /// and any error opening the input or writing the output. Failures of
    /// individual passes are reported on the result instead.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        alt_text: Option<&Path>,
    ) -> Result<RemediationResult, PdfError> {
        if same_file(input, output) {
            return Err(PdfError::SameInputOutput {
                path: output.to_path_buf(),
            });
        }
        let mut doc = PdfDocument::load(input)?;
        info!(input = %input.display(), pages = doc.page_count(), "remediating");

        let mut result = RemediationResult::new(input, output);
        result.processor_results = self.remediate(&mut doc);

        if let Some(sidecar_path) = alt_text {
            result.processor_results.push(inject_from(&mut doc, sidecar_path));
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        doc.save(output)?;
        debug!(output = %output.display(), "output written");

        match write_sidecar(&doc, output) {
            Ok(path) => result.sidecar_path = Some(path),
            Err(e) => warn!(output = %output.display(), error = %e, "sidecar not written"),
        }
        info!(
            output = %output.display(),
            changes = result.total_changes(),
            all_succeeded = result.all_succeeded(),
            "remediation finished"
        );
        Ok(result)
    }
}

/// Inject the reviewed entries of `sidecar` into `input` without running
/// the remediation passes, writing the result to `output`.
pub fn inject_file(input: &Path, sidecar: &Path, output: &Path) -> Result<InjectionReport, PdfError> {
    if same_file(input, output) {
        return Err(PdfError::SameInputOutput {
            path: output.to_path_buf(),
        });
    }
    let sidecar = SidecarStore::load(sidecar)?;
    let mut doc = PdfDocument::load(input)?;
    let report = inject_alt_text(&mut doc, &sidecar)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    doc.save(output)?;
    Ok(report)
}

/// Run one pass, converting both errors and panics into a failed result.
fn run_isolated(processor: &dyn Processor, doc: &mut PdfDocument, config: &Config) -> ProcessorResult {
    let name = processor.name();
    match catch_unwind(AssertUnwindSafe(|| processor.process(doc, config))) {
        Ok(Ok(result)) => {
            debug!(processor = name, changes = result.changes_made, "pass finished");
            result
        }
        Ok(Err(e)) => {
            error!(processor = name, error = %e, "pass failed");
            ProcessorResult::failed(name, e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(processor = name, panic = %message, "pass panicked");
            ProcessorResult::failed(name, format!("panic: {message}"))
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn inject_from(doc: &mut PdfDocument, sidecar_path: &Path) -> ProcessorResult {
    let sidecar = match SidecarStore::load(sidecar_path) {
        Ok(sidecar) => sidecar,
        Err(e) => {
            error!(sidecar = %sidecar_path.display(), error = %e, "cannot load sidecar");
            return ProcessorResult::failed(INJECTOR_NAME, e.to_string());
        }
    };
    match inject_alt_text(doc, &sidecar) {
        Ok(report) => {
            let mut result = ProcessorResult::new(INJECTOR_NAME).with_changes(report.injected());
            for warning in report.warnings {
                result.warn(warning);
            }
            result
        }
        Err(e) => {
            error!(error = %e, "alt-text injection failed");
            ProcessorResult::failed(INJECTOR_NAME, e.to_string())
        }
    }
}

/// Record every image of `doc` in the sidecar belonging to `output`,
/// keeping reviewed entries already present there.
fn write_sidecar(doc: &PdfDocument, output: &Path) -> Result<PathBuf, PdfError> {
    let (mut sidecar, path) = SidecarStore::load_or_create(output)?;
    let mut added = 0;
    for image in doc.document_images()? {
        if sidecar.upsert(&image) {
            added += 1;
        }
    }
    SidecarStore::save(&sidecar, &path)?;
    debug!(sidecar = %path.display(), images = sidecar.images.len(), added, "sidecar written");
    Ok(path)
}

/// Whether two paths name the same file. The output usually does not
/// exist yet, so its parent directory is canonicalized instead.
fn same_file(input: &Path, output: &Path) -> bool {
    if input == output {
        return true;
    }
    let Ok(input) = input.canonicalize() else {
        return false;
    };
    if let Ok(output) = output.canonicalize() {
        return input == output;
    }
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.canonicalize(),
        _ => std::env::current_dir(),
    };
    match (parent, output.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name) == input,
        _ => false,
    }
}
