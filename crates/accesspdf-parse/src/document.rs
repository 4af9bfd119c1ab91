//! The lopdf-backed document arena.
//!
//! [`PdfDocument`] owns a [`lopdf::Document`] and caches the page order.
//! Every cross-object pointer (`/P`, `/Pg`, `OBJR` targets) stays an
//! [`ObjectId`] into this arena and is resolved through explicit lookups.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use accesspdf_core::{ImageInfo, PdfError};
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::error::BackendError;
use crate::serialize::serialize;
use crate::tokenizer::{Operator, tokenize};

/// Maximum Form XObject nesting followed when collecting image hashes.
const MAX_FORM_DEPTH: usize = 16;

/// Kind of an XObject resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XObjectKind {
    Image,
    Form,
    Other,
}

/// An image XObject listed in a page's resources.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageXObject {
    /// Resource name used by `Do`, without the leading `/`.
    pub name: String,
    /// Indirect object id, `None` for a stream stored inline in the resource dictionary.
    pub id: Option<ObjectId>,
    /// MD5 hex digest of the raw encoded stream bytes.
    pub hash: String,
    pub width: u32,
    pub height: u32,
    pub color_space: String,
}

/// MD5 hex digest of a stream's raw (still encoded) bytes.
pub fn content_hash(stream: &Stream) -> String {
    format!("{:x}", md5::compute(&stream.content))
}

/// Follow an indirect reference, returning the object itself otherwise.
pub fn resolve<'a>(doc: &'a lopdf::Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8, else Windows-1252.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => decode_win_ansi(bytes),
    }
}

/// Decode bytes shown with a simple font. Standard-encoded Latin text is
/// close enough to Windows-1252 for matching and language detection.
pub fn decode_win_ansi(bytes: &[u8]) -> String {
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Encode a text string object, using UTF-16BE with BOM when the text is not ASCII.
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::string_literal(text)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Read a string or name entry from a dictionary, resolving references.
pub fn dict_string(doc: &lopdf::Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Stream bytes with filters applied; unfiltered streams are returned as is.
pub fn stream_bytes(stream: &Stream) -> Result<Vec<u8>, BackendError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| BackendError::Parse(format!("failed to decompress content stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// Integer or real value of a numeric object.
pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn as_u32(obj: &Object) -> u32 {
    match obj {
        Object::Integer(i) => u32::try_from(*i).unwrap_or(0),
        Object::Real(r) if *r > 0.0 => *r as u32,
        _ => 0,
    }
}

/// A loaded PDF with its page order cached.
#[derive(Debug)]
pub struct PdfDocument {
    inner: lopdf::Document,
    page_ids: Vec<ObjectId>,
}

impl PdfDocument {
    /// Parse a document from bytes.
    ///
    /// # Errors
    ///
    /// [`BackendError::Parse`] for malformed input and
    /// [`PdfError::PasswordRequired`] for encrypted documents.
    pub fn load_mem(bytes: &[u8]) -> Result<Self, BackendError> {
        let inner = lopdf::Document::load_mem(bytes)
            .map_err(|e| BackendError::Parse(format!("failed to parse PDF: {e}")))?;
        Self::from_document(inner)
    }

    /// Read and parse a document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::load_mem(&bytes)
    }

    /// Wrap an already parsed document.
    pub fn from_document(inner: lopdf::Document) -> Result<Self, BackendError> {
        if inner.is_encrypted() {
            return Err(BackendError::Core(PdfError::PasswordRequired));
        }
        let page_ids = inner.get_pages().into_values().collect();
        Ok(Self { inner, page_ids })
    }

    /// Write the document to `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), BackendError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        self.inner.save_to(&mut buf)?;
        Ok(buf)
    }

    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut lopdf::Document {
        &mut self.inner
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    pub fn page_id(&self, index: usize) -> Result<ObjectId, BackendError> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            BackendError::Parse(format!(
                "page index {index} out of range (0..{})",
                self.page_ids.len()
            ))
        })
    }

    /// 0-based index of a page object.
    pub fn page_index(&self, id: ObjectId) -> Option<usize> {
        self.page_ids.iter().position(|p| *p == id)
    }

    pub fn catalog_id(&self) -> Result<ObjectId, BackendError> {
        self.inner
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|_| BackendError::Parse("trailer has no /Root reference".to_string()))
    }

    pub fn catalog(&self) -> Result<&Dictionary, BackendError> {
        let id = self.catalog_id()?;
        Ok(self.inner.get_dictionary(id)?)
    }

    pub fn catalog_mut(&mut self) -> Result<&mut Dictionary, BackendError> {
        let id = self.catalog_id()?;
        Ok(self.inner.get_dictionary_mut(id)?)
    }

    pub fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        resolve(&self.inner, obj)
    }

    /// Resolve an object to a dictionary, following one reference.
    pub fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj) {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn dict(&self, id: ObjectId) -> Result<&Dictionary, BackendError> {
        Ok(self.inner.get_dictionary(id)?)
    }

    pub fn dict_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary, BackendError> {
        Ok(self.inner.get_dictionary_mut(id)?)
    }

    pub fn add_object(&mut self, obj: impl Into<Object>) -> ObjectId {
        self.inner.add_object(obj)
    }

    pub fn page_dict(&self, index: usize) -> Result<&Dictionary, BackendError> {
        let id = self.page_id(index)?;
        self.dict(id)
    }

    pub fn page_dict_mut(&mut self, index: usize) -> Result<&mut Dictionary, BackendError> {
        let id = self.page_id(index)?;
        self.dict_mut(id)
    }

    /// Look up a page attribute, walking up `/Parent` for inheritable keys.
    pub fn page_inherited(&self, index: usize, key: &[u8]) -> Result<Option<&Object>, BackendError> {
        let mut current = self.page_id(index)?;
        let mut seen = HashSet::new();
        loop {
            if !seen.insert(current) {
                return Ok(None);
            }
            let dict = self.dict(current)?;
            if let Ok(value) = dict.get(key) {
                return Ok(Some(value));
            }
            match dict.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) => current = parent,
                Err(_) => return Ok(None),
            }
        }
    }

    /// The page's resource dictionary, inherited if necessary.
    pub fn page_resources(&self, index: usize) -> Result<Option<&Dictionary>, BackendError> {
        Ok(self
            .page_inherited(index, b"Resources")?
            .and_then(|obj| self.resolve_dict(obj)))
    }

    /// Decoded content stream bytes, concatenating `/Contents` arrays.
    pub fn page_content(&self, index: usize) -> Result<Vec<u8>, BackendError> {
        let page = self.page_dict(index)?;
        let Ok(contents) = page.get(b"Contents") else {
            return Ok(Vec::new());
        };
        match self.resolve(contents) {
            Object::Stream(stream) => stream_bytes(stream),
            Object::Array(items) => {
                let mut content = Vec::new();
                for item in items {
                    let stream = self.resolve(item).as_stream().map_err(|e| {
                        BackendError::Parse(format!("/Contents array item is not a stream: {e}"))
                    })?;
                    if !content.is_empty() {
                        content.push(b'\n');
                    }
                    content.extend_from_slice(&stream_bytes(stream)?);
                }
                Ok(content)
            }
            _ => Err(BackendError::Parse(
                "/Contents is not a stream or array".to_string(),
            )),
        }
    }

    /// Tokenized content stream of a page.
    pub fn page_operators(&self, index: usize) -> Result<Vec<Operator>, BackendError> {
        tokenize(&self.page_content(index)?)
    }

    /// Replace a page's content with the serialized operators.
    ///
    /// A single content stream owned by this page alone is rewritten in
    /// place; otherwise a fresh stream object is attached.
    pub fn set_page_content(&mut self, index: usize, ops: &[Operator]) -> Result<(), BackendError> {
        let bytes = serialize(ops);
        let page_id = self.page_id(index)?;
        let existing = self
            .page_dict(index)?
            .get(b"Contents")
            .and_then(Object::as_reference)
            .ok();

        if let Some(stream_id) = existing {
            let shared = self.page_ids.iter().any(|&other| {
                other != page_id
                    && self
                        .inner
                        .get_dictionary(other)
                        .and_then(|d| d.get(b"Contents"))
                        .and_then(Object::as_reference)
                        .is_ok_and(|id| id == stream_id)
            });
            if !shared {
                if let Ok(Object::Stream(stream)) = self.inner.get_object_mut(stream_id) {
                    stream.dict.remove(b"Filter");
                    stream.dict.remove(b"DecodeParms");
                    stream.set_content(bytes);
                    return Ok(());
                }
            }
        }

        let stream_id = self.add_object(Stream::new(Dictionary::new(), bytes));
        self.dict_mut(page_id)?.set("Contents", stream_id);
        debug!(page = index, "attached new content stream");
        Ok(())
    }

    fn xobject_dict<'a>(&'a self, resources: &'a Dictionary) -> Option<&'a Dictionary> {
        resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
    }

    fn xobject_stream<'a>(&'a self, obj: &'a Object) -> Option<(Option<ObjectId>, &'a Stream)> {
        let id = obj.as_reference().ok();
        match self.resolve(obj) {
            Object::Stream(stream) => Some((id, stream)),
            _ => None,
        }
    }

    /// A four-number rectangle such as an annotation `/Rect`, normalized
    /// to `[llx, lly, urx, ury]`.
    pub fn rect(&self, obj: &Object) -> Option<[f64; 4]> {
        let Object::Array(items) = self.resolve(obj) else {
            return None;
        };
        let values: Vec<f64> = items
            .iter()
            .filter_map(|o| number(self.resolve(o)))
            .collect();
        let [x0, y0, x1, y1] = values.as_slice() else {
            return None;
        };
        Some([x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)])
    }

    /// Kind of the named XObject in the page's resources.
    pub fn xobject_kind(&self, index: usize, name: &str) -> Result<Option<XObjectKind>, BackendError> {
        let Some(resources) = self.page_resources(index)? else {
            return Ok(None);
        };
        let Some(xobjects) = self.xobject_dict(resources) else {
            return Ok(None);
        };
        let Some((_, stream)) = xobjects
            .get(name.as_bytes())
            .ok()
            .and_then(|obj| self.xobject_stream(obj))
        else {
            return Ok(None);
        };
        Ok(Some(match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => XObjectKind::Image,
            Ok(b"Form") => XObjectKind::Form,
            _ => XObjectKind::Other,
        }))
    }

    /// Image XObjects listed directly in the page's resources.
    pub fn image_xobjects(&self, index: usize) -> Result<Vec<ImageXObject>, BackendError> {
        let Some(resources) = self.page_resources(index)? else {
            return Ok(Vec::new());
        };
        Ok(self.images_in_resources(resources))
    }

    fn images_in_resources(&self, resources: &Dictionary) -> Vec<ImageXObject> {
        let Some(xobjects) = self.xobject_dict(resources) else {
            return Vec::new();
        };
        xobjects
            .iter()
            .filter_map(|(name, obj)| {
                let (id, stream) = self.xobject_stream(obj)?;
                if stream.dict.get(b"Subtype").and_then(Object::as_name).ok()? != b"Image" {
                    return None;
                }
                Some(self.describe_image(String::from_utf8_lossy(name).into_owned(), id, stream))
            })
            .collect()
    }

    fn describe_image(&self, name: String, id: Option<ObjectId>, stream: &Stream) -> ImageXObject {
        let dim = |key: &[u8]| {
            stream
                .dict
                .get(key)
                .map(|o| as_u32(self.resolve(o)))
                .unwrap_or(0)
        };
        let color_space = match stream.dict.get(b"ColorSpace").map(|o| self.resolve(o)) {
            Ok(Object::Name(n)) => String::from_utf8_lossy(n).into_owned(),
            Ok(Object::Array(items)) => items
                .first()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned())
                .unwrap_or_default(),
            _ => String::new(),
        };
        ImageXObject {
            name,
            id,
            hash: content_hash(stream),
            width: dim(b"Width"),
            height: dim(b"Height"),
            color_space,
        }
    }

    /// Every image reachable from the page, descending into Form XObjects.
    pub fn page_images_deep(&self, index: usize) -> Result<Vec<ImageXObject>, BackendError> {
        let mut out = Vec::new();
        let Some(resources) = self.page_resources(index)? else {
            return Ok(out);
        };
        let mut visited = HashSet::new();
        self.collect_images(resources, 0, &mut visited, &mut out);
        Ok(out)
    }

    fn collect_images(
        &self,
        resources: &Dictionary,
        depth: usize,
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<ImageXObject>,
    ) {
        if depth > MAX_FORM_DEPTH {
            return;
        }
        out.extend(self.images_in_resources(resources));
        let Some(xobjects) = self.xobject_dict(resources) else {
            return;
        };
        for (_, obj) in xobjects.iter() {
            let Some((id, stream)) = self.xobject_stream(obj) else {
                continue;
            };
            if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Form".as_slice()) {
                continue;
            }
            if let Some(id) = id {
                if !visited.insert(id) {
                    continue;
                }
            }
            if let Some(form_resources) = stream
                .dict
                .get(b"Resources")
                .ok()
                .and_then(|o| self.resolve_dict(o))
            {
                self.collect_images(form_resources, depth + 1, visited, out);
            }
        }
    }

    /// Content hashes of every image drawn on the page, including nested forms.
    pub fn page_image_hashes(&self, index: usize) -> Result<BTreeSet<String>, BackendError> {
        Ok(self
            .page_images_deep(index)?
            .into_iter()
            .map(|img| img.hash)
            .collect())
    }

    /// Distinct images in page order; each reports the first page it appears on.
    pub fn document_images(&self) -> Result<Vec<ImageInfo>, BackendError> {
        let mut seen = HashSet::new();
        let mut images = Vec::new();
        for index in 0..self.page_count() {
            for img in self.page_images_deep(index)? {
                if seen.insert(img.hash.clone()) {
                    images.push(ImageInfo {
                        hash: img.hash,
                        page: index + 1,
                        width: img.width,
                        height: img.height,
                        color_space: img.color_space,
                        caption: String::new(),
                    });
                }
            }
        }
        Ok(images)
    }

    /// Find an image stream anywhere in the document by content hash.
    pub fn find_image_stream(&self, hash: &str) -> Option<&Stream> {
        self.inner.objects.values().find_map(|obj| match obj {
            Object::Stream(stream)
                if stream.dict.get(b"Subtype").and_then(Object::as_name).ok()
                    == Some(b"Image".as_slice())
                    && content_hash(stream) == hash =>
            {
                Some(stream)
            }
            _ => None,
        })
    }

    /// `/BaseFont` of a font resource on the page.
    pub fn font_base_name(&self, index: usize, resource_name: &str) -> Option<String> {
        let resources = self.page_resources(index).ok()??;
        let fonts = resources.get(b"Font").ok().and_then(|o| self.resolve_dict(o))?;
        let font = fonts
            .get(resource_name.as_bytes())
            .ok()
            .and_then(|o| self.resolve_dict(o))?;
        dict_string(&self.inner, font, b"BaseFont")
    }

    /// Document information dictionary, if any.
    pub fn info_dict(&self) -> Option<&Dictionary> {
        let info = self.inner.trailer.get(b"Info").ok()?;
        self.resolve_dict(info)
    }

    /// Mutable document information dictionary, created if missing.
    pub fn info_dict_mut(&mut self) -> Result<&mut Dictionary, BackendError> {
        let id = match self.inner.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) => id,
            Err(_) => {
                let id = self.add_object(Dictionary::new());
                self.inner.trailer.set("Info", id);
                id
            }
        };
        self.dict_mut(id)
    }
}
