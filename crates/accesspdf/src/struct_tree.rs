//! Structure tree access over the document arena.
//!
//! Elements are plain dictionaries in the [`PdfDocument`] arena; this
//! module gives them a typed view ([`StructElement`]) and the mutations the
//! remediation passes need. All links between elements, pages and
//! annotations are [`ObjectId`]s.

use std::collections::{BTreeMap, HashSet};

use accesspdf_core::{PdfError, StructRole};
use accesspdf_parse::{PdfDocument, dict_string, encode_text_string};
use lopdf::{Dictionary, Object, ObjectId, dictionary};
use tracing::debug;

/// Maximum depth followed when walking the tree.
const MAX_DEPTH: usize = 64;

/// One entry of an element's `/K`.
#[derive(Debug, Clone, PartialEq)]
pub enum Kid {
    /// A child structure element.
    Element(ObjectId),
    /// A bare MCID on the element's own page.
    Mcid(u32),
    /// A marked-content reference dictionary, possibly naming another page.
    MarkedRef { mcid: u32, page: Option<ObjectId> },
    /// An object reference (`OBJR`), e.g. to a link annotation.
    ObjectRef { obj: ObjectId, page: Option<ObjectId> },
}

impl Kid {
    fn from_object(doc: &PdfDocument, obj: &Object) -> Option<Kid> {
        match obj {
            Object::Integer(i) => u32::try_from(*i).ok().map(Kid::Mcid),
            Object::Reference(id) => {
                let dict = doc.dict(*id).ok()?;
                Kid::from_dict(dict).or(Some(Kid::Element(*id)))
            }
            Object::Dictionary(dict) => Kid::from_dict(dict),
            _ => None,
        }
    }

    /// MCR and OBJR dictionaries; `None` for anything else.
    fn from_dict(dict: &Dictionary) -> Option<Kid> {
        let page = dict.get(b"Pg").and_then(Object::as_reference).ok();
        match dict.get(b"Type").and_then(Object::as_name).ok() {
            Some(b"MCR") => {
                let mcid = dict.get(b"MCID").and_then(Object::as_i64).ok()?;
                Some(Kid::MarkedRef {
                    mcid: u32::try_from(mcid).ok()?,
                    page,
                })
            }
            Some(b"OBJR") => Some(Kid::ObjectRef {
                obj: dict.get(b"Obj").and_then(Object::as_reference).ok()?,
                page,
            }),
            _ => None,
        }
    }
}

/// Typed view of a structure element dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct StructElement {
    pub id: ObjectId,
    pub role: StructRole,
    pub parent: Option<ObjectId>,
    pub page: Option<ObjectId>,
    pub kids: Vec<Kid>,
    pub alt_text: Option<String>,
    pub actual_text: Option<String>,
}

impl StructElement {
    pub fn load(doc: &PdfDocument, id: ObjectId) -> Result<Self, PdfError> {
        let dict = doc.dict(id)?;
        let role = dict
            .get(b"S")
            .and_then(Object::as_name)
            .map(|n| StructRole::from_name(&String::from_utf8_lossy(n)))
            .map_err(|_| PdfError::StructureError(format!("element {id:?} has no /S")))?;
        let kids = match dict.get(b"K") {
            Ok(obj) => match doc.resolve(obj) {
                Object::Array(items) => items
                    .iter()
                    .filter_map(|item| Kid::from_object(doc, item))
                    .collect(),
                _ => Kid::from_object(doc, obj).into_iter().collect(),
            },
            Err(_) => Vec::new(),
        };
        Ok(Self {
            id,
            role,
            parent: dict.get(b"P").and_then(Object::as_reference).ok(),
            page: dict.get(b"Pg").and_then(Object::as_reference).ok(),
            kids,
            alt_text: dict_string(doc.inner(), dict, b"Alt"),
            actual_text: dict_string(doc.inner(), dict, b"ActualText"),
        })
    }

    /// MCIDs owned directly by this element, with the page each lives on.
    pub fn mcids(&self) -> Vec<(u32, Option<ObjectId>)> {
        self.kids
            .iter()
            .filter_map(|kid| match kid {
                Kid::Mcid(mcid) => Some((*mcid, self.page)),
                Kid::MarkedRef { mcid, page } => Some((*mcid, page.or(self.page))),
                _ => None,
            })
            .collect()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.kids.iter().filter_map(|kid| match kid {
            Kid::Element(id) => Some(*id),
            _ => None,
        })
    }

    /// The page this element belongs to: its own `/Pg`, else the first
    /// page named by a kid or a child element.
    pub fn owning_page(&self, doc: &PdfDocument) -> Option<ObjectId> {
        if self.page.is_some() {
            return self.page;
        }
        self.kids.iter().find_map(|kid| match kid {
            Kid::MarkedRef { page, .. } | Kid::ObjectRef { page, .. } => *page,
            Kid::Element(id) => doc
                .dict(*id)
                .ok()
                .and_then(|d| d.get(b"Pg").and_then(Object::as_reference).ok()),
            Kid::Mcid(_) => None,
        })
    }

    /// `/Alt` present and non-empty.
    pub fn has_alt_text(&self) -> bool {
        self.alt_text.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

/// Handle to a document's `/StructTreeRoot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructTree {
    root_id: ObjectId,
}

impl StructTree {
    /// The existing tree, if the catalog has an indirect `/StructTreeRoot`.
    pub fn find(doc: &PdfDocument) -> Option<Self> {
        let root_id = doc
            .catalog()
            .ok()?
            .get(b"StructTreeRoot")
            .and_then(Object::as_reference)
            .ok()?;
        doc.dict(root_id).ok()?;
        Some(Self { root_id })
    }

    /// Whether the document already carries a populated structure tree.
    pub fn is_tagged(doc: &PdfDocument) -> bool {
        Self::find(doc).is_some_and(|tree| !tree.root_kids(doc).is_empty())
    }

    /// Find or create the root, with `/RoleMap` and an (empty) `/ParentTree`.
    pub fn ensure(doc: &mut PdfDocument) -> Result<Self, PdfError> {
        let existing = doc.catalog()?.get(b"StructTreeRoot").ok().cloned();
        let root_id = match existing {
            Some(Object::Reference(id)) => id,
            Some(Object::Dictionary(dict)) => {
                let id = doc.add_object(dict);
                doc.catalog_mut()?.set("StructTreeRoot", id);
                id
            }
            _ => {
                let id = doc.add_object(dictionary! { "Type" => "StructTreeRoot" });
                doc.catalog_mut()?.set("StructTreeRoot", id);
                debug!("created StructTreeRoot");
                id
            }
        };

        let needs_parent_tree = !doc.dict(root_id)?.has(b"ParentTree");
        let parent_tree_id = needs_parent_tree.then(|| {
            doc.add_object(dictionary! { "Nums" => Vec::<Object>::new() })
        });
        let root = doc.dict_mut(root_id)?;
        if !root.has(b"Type") {
            root.set("Type", "StructTreeRoot");
        }
        if !root.has(b"RoleMap") {
            root.set("RoleMap", Dictionary::new());
        }
        if let Some(id) = parent_tree_id {
            root.set("ParentTree", id);
        }
        Ok(Self { root_id })
    }

    pub fn root_id(&self) -> ObjectId {
        self.root_id
    }

    /// Raw `/K` entries of a node (the root or an element), as an array.
    pub fn raw_kids(doc: &PdfDocument, id: ObjectId) -> Vec<Object> {
        let Ok(dict) = doc.dict(id) else {
            return Vec::new();
        };
        match dict.get(b"K") {
            Ok(obj) => match doc.resolve(obj) {
                Object::Array(items) => items.clone(),
                Object::Null => Vec::new(),
                _ => vec![obj.clone()],
            },
            Err(_) => Vec::new(),
        }
    }

    /// Replace a node's `/K`.
    pub fn set_raw_kids(doc: &mut PdfDocument, id: ObjectId, kids: Vec<Object>) -> Result<(), PdfError> {
        doc.dict_mut(id)?.set("K", kids);
        Ok(())
    }

    /// Structure element ids directly under the root.
    pub fn root_kids(&self, doc: &PdfDocument) -> Vec<ObjectId> {
        Self::raw_kids(doc, self.root_id)
            .iter()
            .filter_map(|k| k.as_reference().ok())
            .collect()
    }

    /// The top-level element new content is attached to: the root's only
    /// element child, whatever its role.
    pub fn document_element(&self, doc: &PdfDocument) -> Option<ObjectId> {
        match self.root_kids(doc).as_slice() {
            [only] => Some(*only),
            kids => kids.iter().copied().find(|id| {
                StructElement::load(doc, *id).is_ok_and(|e| e.role == StructRole::Document)
            }),
        }
    }

    /// Find or create the `Document` element. Existing top-level elements
    /// are moved under a new `Document` when there is more than one.
    pub fn ensure_document_element(&self, doc: &mut PdfDocument) -> Result<ObjectId, PdfError> {
        if let Some(id) = self.document_element(doc) {
            return Ok(id);
        }
        let previous = Self::raw_kids(doc, self.root_id);
        let document_id = doc.add_object(dictionary! {
            "Type" => "StructElem",
            "S" => "Document",
            "P" => self.root_id,
            "K" => previous.clone(),
        });
        for kid in previous.iter().filter_map(|k| k.as_reference().ok()) {
            if let Ok(dict) = doc.dict_mut(kid) {
                if dict.has(b"S") {
                    dict.set("P", document_id);
                }
            }
        }
        doc.dict_mut(self.root_id)?.set("K", vec![Object::Reference(document_id)]);
        debug!(moved = previous.len(), "created Document element");
        Ok(document_id)
    }

    /// Create an element with an empty `/K` and append it to `parent`.
    pub fn create_element(
        &self,
        doc: &mut PdfDocument,
        role: &StructRole,
        parent: ObjectId,
        page: Option<ObjectId>,
    ) -> Result<ObjectId, PdfError> {
        let mut dict = dictionary! {
            "Type" => "StructElem",
            "S" => Object::Name(role.as_name().into_bytes()),
            "P" => parent,
            "K" => Vec::<Object>::new(),
        };
        if let Some(page) = page {
            dict.set("Pg", page);
        }
        let id = doc.add_object(dict);
        Self::append_kid(doc, parent, Object::Reference(id))?;
        Ok(id)
    }

    /// Append to a node's `/K`, converting a single kid into an array.
    pub fn append_kid(doc: &mut PdfDocument, parent: ObjectId, kid: Object) -> Result<(), PdfError> {
        let mut kids = Self::raw_kids(doc, parent);
        kids.push(kid);
        Self::set_raw_kids(doc, parent, kids)
    }

    pub fn set_role(doc: &mut PdfDocument, id: ObjectId, role: &StructRole) -> Result<(), PdfError> {
        doc.dict_mut(id)?
            .set("S", Object::Name(role.as_name().into_bytes()));
        Ok(())
    }

    pub fn set_alt_text(doc: &mut PdfDocument, id: ObjectId, text: &str) -> Result<(), PdfError> {
        doc.dict_mut(id)?.set("Alt", encode_text_string(text));
        Ok(())
    }

    pub fn set_actual_text(doc: &mut PdfDocument, id: ObjectId, text: &str) -> Result<(), PdfError> {
        doc.dict_mut(id)?.set("ActualText", encode_text_string(text));
        Ok(())
    }

    /// All elements in depth-first document order. Cycles and nesting past
    /// the depth limit are cut off.
    pub fn elements(&self, doc: &PdfDocument) -> Vec<StructElement> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        for id in self.root_kids(doc) {
            walk(doc, id, 0, &mut visited, &mut out);
        }
        out
    }

    pub fn contains_role(&self, doc: &PdfDocument, role: &StructRole) -> bool {
        self.elements(doc).iter().any(|e| &e.role == role)
    }

    /// Number of elements per role name.
    pub fn role_counts(&self, doc: &PdfDocument) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for element in self.elements(doc) {
            *counts.entry(element.role.as_name()).or_insert(0) += 1;
        }
        counts
    }

    /// Problems with the tree's shape: elements without `/P`, and MCIDs
    /// claimed twice on the same page.
    pub fn check_well_formed(&self, doc: &PdfDocument) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen: HashSet<(ObjectId, u32)> = HashSet::new();
        for element in self.elements(doc) {
            if element.parent.is_none() {
                problems.push(format!("element {:?} ({}) has no /P", element.id, element.role));
            }
            for (mcid, page) in element.mcids() {
                let Some(page) = page else {
                    problems.push(format!(
                        "element {:?} owns MCID {mcid} without a page",
                        element.id
                    ));
                    continue;
                };
                if !seen.insert((page, mcid)) {
                    problems.push(format!("MCID {mcid} on page {page:?} is claimed twice"));
                }
            }
        }
        problems
    }
}

fn walk(
    doc: &PdfDocument,
    id: ObjectId,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<StructElement>,
) {
    if depth >= MAX_DEPTH || !visited.insert(id) {
        return;
    }
    let Ok(element) = StructElement::load(doc, id) else {
        return;
    };
    let children: Vec<ObjectId> = element.child_elements().collect();
    out.push(element);
    for child in children {
        walk(doc, child, depth + 1, visited, out);
    }
}
