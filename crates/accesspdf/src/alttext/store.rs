//! Reading and writing sidecar files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use accesspdf_core::{PdfError, SidecarFile};

/// Double suffix replacing a PDF's extension.
pub const SIDECAR_SUFFIX: &str = "alttext.yaml";

/// Filesystem access to sidecar files.
pub struct SidecarStore;

impl SidecarStore {
    /// `report.pdf` -> `report.alttext.yaml`, in the same directory.
    pub fn path_for(pdf_path: &Path) -> PathBuf {
        pdf_path.with_extension(SIDECAR_SUFFIX)
    }

    pub fn load(path: &Path) -> Result<SidecarFile, PdfError> {
        let text = fs::read_to_string(path)
            .map_err(|e| PdfError::SidecarError(format!("{}: {e}", path.display())))?;
        if text.trim().is_empty() {
            return Err(PdfError::SidecarError(format!(
                "sidecar file is empty: {}",
                path.display()
            )));
        }
        serde_yaml::from_str(&text)
            .map_err(|e| PdfError::SidecarError(format!("{}: {e}", path.display())))
    }

    /// Serialize to YAML. Field order follows the struct definitions, so
    /// equal sidecars always produce identical text.
    pub fn to_yaml(sidecar: &SidecarFile) -> Result<String, PdfError> {
        serde_yaml::to_string(sidecar).map_err(|e| PdfError::SidecarError(e.to_string()))
    }

    pub fn save(sidecar: &SidecarFile, path: &Path) -> Result<(), PdfError> {
        let yaml = Self::to_yaml(sidecar)?;
        fs::write(path, yaml)
            .map_err(|e| PdfError::SidecarError(format!("{}: {e}", path.display())))
    }

    /// The existing sidecar for `pdf_path`, or a new empty one, together
    /// with the path it belongs at.
    pub fn load_or_create(pdf_path: &Path) -> Result<(SidecarFile, PathBuf), PdfError> {
        let path = Self::path_for(pdf_path);
        if path.is_file() {
            return Ok((Self::load(&path)?, path));
        }
        let name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok((SidecarFile::new(name), path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accesspdf_core::{AltTextStatus, ImageInfo};

    fn image(hash: &str) -> ImageInfo {
        ImageInfo {
            hash: hash.to_string(),
            page: 1,
            width: 2,
            height: 2,
            color_space: "DeviceRGB".to_string(),
            caption: String::new(),
        }
    }

    #[test]
    fn path_replaces_extension() {
        assert_eq!(
            SidecarStore::path_for(Path::new("/docs/report.pdf")),
            PathBuf::from("/docs/report.alttext.yaml")
        );
        assert_eq!(
            SidecarStore::path_for(Path::new("scan.v2.pdf")),
            PathBuf::from("scan.v2.alttext.yaml")
        );
    }

    #[test]
    fn save_then_load_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.alttext.yaml");
        let mut sidecar = SidecarFile::new("doc.pdf");
        sidecar.upsert(&image("abcdef0123"));
        sidecar.get_entry_mut("abcdef0123").unwrap().status = AltTextStatus::Decorative;
        SidecarStore::save(&sidecar, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("status: decorative"));
        assert_eq!(SidecarStore::load(&path).unwrap(), sidecar);
    }

    #[test]
    fn serialization_is_deterministic() {
        let mut sidecar = SidecarFile::new("doc.pdf");
        sidecar.upsert(&image("111111aaaa"));
        sidecar.upsert(&image("222222bbbb"));
        let first = SidecarStore::to_yaml(&sidecar).unwrap();
        let reparsed: SidecarFile = serde_yaml::from_str(&first).unwrap();
        assert_eq!(SidecarStore::to_yaml(&reparsed).unwrap(), first);
        let document_at = first.find("document:").unwrap();
        let images_at = first.find("images:").unwrap();
        assert!(document_at < images_at);
    }

    #[test]
    fn load_or_create_new_and_existing() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("paper.pdf");
        let (fresh, path) = SidecarStore::load_or_create(&pdf).unwrap();
        assert_eq!(fresh.document, "paper.pdf");
        assert!(fresh.images.is_empty());
        assert!(!path.exists());

        let mut saved = fresh.clone();
        saved.upsert(&image("cafebabe00"));
        SidecarStore::save(&saved, &path).unwrap();
        let (loaded, _) = SidecarStore::load_or_create(&pdf).unwrap();
        assert_eq!(loaded.images.len(), 1);
    }

    #[test]
    fn empty_or_malformed_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.alttext.yaml");
        fs::write(&empty, "   \n").unwrap();
        assert!(matches!(SidecarStore::load(&empty), Err(PdfError::SidecarError(_))));

        let bad = dir.path().join("bad.alttext.yaml");
        fs::write(&bad, "images: [unclosed").unwrap();
        assert!(matches!(SidecarStore::load(&bad), Err(PdfError::SidecarError(_))));
    }
}
