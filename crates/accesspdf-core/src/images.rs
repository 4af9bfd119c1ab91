use serde::Serialize;

/// An image XObject discovered in a document, identified by content hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    /// MD5 hex digest of the raw (still encoded) stream bytes.
    pub hash: String,
    /// 1-based page number of the first page drawing the image.
    pub page: usize,
    pub width: u32,
    pub height: u32,
    /// Color space name, empty when it is not a plain name.
    pub color_space: String,
    pub caption: String,
}

impl ImageInfo {
    /// First six characters of the hash, the sidecar's short label.
    pub fn short_id(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(6)
            .map_or(self.hash.len(), |(i, _)| i);
        &self.hash[..end]
    }
}
