//! Outcome records for processors, single documents, and batches.

use std::path::PathBuf;

use serde::Serialize;

/// Outcome of one remediation pass.
///
/// `changes_made` counts the structural edits the pass performed; a second
/// run of an idempotent pass on its own output reports zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessorResult {
    /// Name of the pass that produced this result (e.g. `"Headings"`).
    pub processor_name: String,
    /// `false` only when the pass failed fatally.
    pub success: bool,
    pub changes_made: usize,
    /// Non-fatal issues encountered while the pass ran.
    pub warnings: Vec<String>,
    /// The fatal error message when `success` is false.
    pub error: Option<String>,
}

impl ProcessorResult {
    /// A successful result with no changes yet.
    pub fn new(processor_name: impl Into<String>) -> Self {
        Self {
            processor_name: processor_name.into(),
            success: true,
            changes_made: 0,
            warnings: Vec::new(),
            error: None,
        }
    }

    /// A failed result carrying the fatal error message.
    pub fn failed(processor_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            processor_name: processor_name.into(),
            success: false,
            changes_made: 0,
            warnings: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Set the change count, returning the modified result (builder pattern).
    pub fn with_changes(mut self, changes: usize) -> Self {
        self.changes_made = changes;
        self
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Aggregated outcome of running the pipeline over one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemediationResult {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    /// Where the alt-text sidecar for the output was written, if it was.
    pub sidecar_path: Option<PathBuf>,
    pub processor_results: Vec<ProcessorResult>,
}

impl RemediationResult {
    pub fn new(source_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            output_path: output_path.into(),
            sidecar_path: None,
            processor_results: Vec::new(),
        }
    }

    /// Sum of `changes_made` over every pass.
    pub fn total_changes(&self) -> usize {
        self.processor_results.iter().map(|r| r.changes_made).sum()
    }

    /// Whether every pass succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.processor_results.iter().all(|r| r.success)
    }

    /// Every warning, prefixed with the name of the pass that raised it.
    pub fn warnings(&self) -> Vec<String> {
        self.processor_results
            .iter()
            .flat_map(|r| {
                r.warnings
                    .iter()
                    .map(move |w| format!("[{}] {w}", r.processor_name))
            })
            .collect()
    }

    /// Look up the result of a named pass.
    pub fn processor(&self, name: &str) -> Option<&ProcessorResult> {
        self.processor_results
            .iter()
            .find(|r| r.processor_name == name)
    }
}

/// Aggregated outcome of a batch run. A failed document never prevents the
/// others from being processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    pub results: Vec<RemediationResult>,
    /// Inputs that failed as a whole, with the error message.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.results.len() + self.failed.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(name: &str, changes: usize, warnings: &[&str]) -> ProcessorResult {
        let mut r = ProcessorResult::new(name).with_changes(changes);
        for w in warnings {
            r.warn(*w);
        }
        r
    }

    #[test]
    fn totals_and_success() {
        let mut rr = RemediationResult::new("in.pdf", "out.pdf");
        rr.processor_results.push(result_with("TagStructure", 4, &[]));
        rr.processor_results.push(result_with("Metadata", 2, &[]));
        assert_eq!(rr.total_changes(), 6);
        assert!(rr.all_succeeded());

        rr.processor_results
            .push(ProcessorResult::failed("Tables", "bad grid"));
        assert!(!rr.all_succeeded());
        assert_eq!(rr.processor("Tables").unwrap().error.as_deref(), Some("bad grid"));
    }

    #[test]
    fn warnings_are_prefixed_with_pass_name() {
        let mut rr = RemediationResult::new("in.pdf", "out.pdf");
        rr.processor_results
            .push(result_with("Headings", 0, &["Heading nesting skip: H1 -> H3"]));
        assert_eq!(
            rr.warnings(),
            vec!["[Headings] Heading nesting skip: H1 -> H3".to_string()]
        );
    }

    #[test]
    fn failed_result_has_no_changes() {
        let r = ProcessorResult::failed("Links", "oops");
        assert!(!r.success);
        assert_eq!(r.changes_made, 0);
    }

    #[test]
    fn batch_counts() {
        let mut batch = BatchResult::default();
        batch.results.push(RemediationResult::new("a.pdf", "a_out.pdf"));
        batch
            .failed
            .push((PathBuf::from("b.pdf"), "not a PDF".to_string()));
        assert_eq!(batch.total(), 2);
        assert_eq!(batch.succeeded(), 1);
    }
}
