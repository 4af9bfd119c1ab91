//! The alt-text sidecar model.
//!
//! A sidecar (`report.alttext.yaml` next to `report.pdf`) records one entry
//! per distinct image, keyed by content hash so entries survive re-saves
//! that renumber objects. Serialization is field-ordered and stable, so the
//! same logical content always produces the same bytes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::images::ImageInfo;

/// Review state of an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltTextStatus {
    #[default]
    NeedsReview,
    Approved,
    Decorative,
}

impl AltTextStatus {
    pub const ALL: [AltTextStatus; 3] = [
        AltTextStatus::NeedsReview,
        AltTextStatus::Approved,
        AltTextStatus::Decorative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AltTextStatus::NeedsReview => "needs_review",
            AltTextStatus::Approved => "approved",
            AltTextStatus::Decorative => "decorative",
        }
    }
}

impl fmt::Display for AltTextStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One image's alt-text record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltTextEntry {
    /// `img_` followed by the first six hash characters.
    pub id: String,
    /// 1-based page of first appearance.
    pub page: usize,
    pub hash: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub ai_draft: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub status: AltTextStatus,
}

impl AltTextEntry {
    /// Approved and decorative entries are written into the PDF.
    pub fn is_actionable(&self) -> bool {
        matches!(
            self.status,
            AltTextStatus::Approved | AltTextStatus::Decorative
        )
    }

    /// Text to write as `/Alt`: the reviewed text, else the AI draft.
    /// Decorative entries always resolve to the empty string.
    pub fn resolved_alt_text(&self) -> Option<&str> {
        match self.status {
            AltTextStatus::Decorative => Some(""),
            AltTextStatus::Approved if !self.alt_text.trim().is_empty() => Some(&self.alt_text),
            AltTextStatus::Approved if !self.ai_draft.trim().is_empty() => Some(&self.ai_draft),
            _ => None,
        }
    }
}

/// Entry counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SidecarStats {
    pub total: usize,
    pub needs_review: usize,
    pub approved: usize,
    pub decorative: usize,
}

/// In-memory form of a sidecar file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidecarFile {
    /// File name of the PDF this sidecar describes.
    pub document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub images: Vec<AltTextEntry>,
}

impl SidecarFile {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            generated: Some(Utc::now()),
            images: Vec::new(),
        }
    }

    pub fn get_entry(&self, hash: &str) -> Option<&AltTextEntry> {
        self.images.iter().find(|e| e.hash == hash)
    }

    pub fn get_entry_mut(&mut self, hash: &str) -> Option<&mut AltTextEntry> {
        self.images.iter_mut().find(|e| e.hash == hash)
    }

    pub fn get_entry_by_id(&self, id: &str) -> Option<&AltTextEntry> {
        self.images.iter().find(|e| e.id == id)
    }

    /// Insert an entry for `image`, or return the existing one untouched so
    /// reviewed text and status are preserved. Returns `true` when inserted.
    pub fn upsert(&mut self, image: &ImageInfo) -> bool {
        if self.get_entry(&image.hash).is_some() {
            return false;
        }
        self.images.push(AltTextEntry {
            id: format!("img_{}", image.short_id()),
            page: image.page,
            hash: image.hash.clone(),
            caption: image.caption.clone(),
            ai_draft: String::new(),
            alt_text: String::new(),
            status: AltTextStatus::NeedsReview,
        });
        true
    }

    /// Entries awaiting review that have no AI draft yet.
    pub fn pending_drafts(&self) -> impl Iterator<Item = &AltTextEntry> {
        self.images
            .iter()
            .filter(|e| e.status == AltTextStatus::NeedsReview && e.ai_draft.trim().is_empty())
    }

    pub fn actionable(&self) -> impl Iterator<Item = &AltTextEntry> {
        self.images.iter().filter(|e| e.is_actionable())
    }

    pub fn stats(&self) -> SidecarStats {
        let mut stats = SidecarStats {
            total: self.images.len(),
            ..SidecarStats::default()
        };
        for entry in &self.images {
            match entry.status {
                AltTextStatus::NeedsReview => stats.needs_review += 1,
                AltTextStatus::Approved => stats.approved += 1,
                AltTextStatus::Decorative => stats.decorative += 1,
            }
        }
        stats
    }
}
