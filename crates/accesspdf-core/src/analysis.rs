//! Accessibility analysis report types.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::images::ImageInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// One accessibility problem found by analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilityIssue {
    /// Rule identifier, e.g. `document-lang`.
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    /// 1-based page, when the issue is page-specific.
    pub page: Option<usize>,
}

impl AccessibilityIssue {
    pub fn new(rule: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            message: message.into(),
            page: None,
        }
    }

    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }
}

/// Result of analysing a document without modifying it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub page_count: usize,
    pub is_tagged: bool,
    pub lang: Option<String>,
    pub title: Option<String>,
    pub images: Vec<ImageInfo>,
    /// Number of structure elements per role name.
    pub role_counts: BTreeMap<String, usize>,
    /// Number of Figure elements lacking `/Alt`.
    pub figures_without_alt: usize,
    pub issues: Vec<AccessibilityIssue>,
}

impl AnalysisResult {
    pub fn role_count(&self, role: &str) -> usize {
        self.role_counts.get(role).copied().unwrap_or(0)
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}
