//! The `/ParentTree` number tree.
//!
//! Maps each page's `/StructParents` key to an array indexed by MCID, and
//! each annotation's `/StructParent` key directly to its element. Updates
//! merge into what is already there: a slot pointing at an element is never
//! overwritten, and unused slots stay explicit nulls.

use std::collections::{BTreeMap, HashSet};

use accesspdf_core::PdfError;
use accesspdf_parse::PdfDocument;
use lopdf::{Dictionary, Object, ObjectId, dictionary};
use tracing::{debug, warn};

use crate::struct_tree::StructTree;

/// Maximum `/Kids` depth followed when reading a number tree.
const MAX_DEPTH: usize = 32;

/// Largest MCID given a parent-tree slot. Slot arrays are dense, so a
/// corrupt `/K` value must not size them.
pub const MAX_MCID: u32 = 1 << 20;

/// Value stored under one number-tree key.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentTreeEntry {
    /// Per-MCID slots of a page; `None` is an explicit null.
    Slots(Vec<Option<ObjectId>>),
    /// A single element, for annotation and XObject keys.
    Direct(ObjectId),
}

/// In-memory copy of a document's parent tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentTree {
    entries: BTreeMap<i64, ParentTreeEntry>,
    /// Indirect slot arrays already in the file, reused when writing.
    array_ids: BTreeMap<i64, ObjectId>,
}

impl ParentTree {
    /// Read the tree, flattening intermediate `/Kids` nodes.
    pub fn read(doc: &PdfDocument, tree: &StructTree) -> Self {
        let mut parent_tree = ParentTree::default();
        let Some(node) = doc
            .dict(tree.root_id())
            .ok()
            .and_then(|root| root.get(b"ParentTree").ok())
            .and_then(|obj| doc.resolve_dict(obj))
        else {
            return parent_tree;
        };
        let mut visited = HashSet::new();
        parent_tree.read_node(doc, node, 0, &mut visited);
        parent_tree
    }

    fn read_node(
        &mut self,
        doc: &PdfDocument,
        node: &Dictionary,
        depth: usize,
        visited: &mut HashSet<ObjectId>,
    ) {
        if depth > MAX_DEPTH {
            return;
        }
        if let Ok(Object::Array(nums)) = node.get(b"Nums").map(|o| doc.resolve(o)) {
            for pair in nums.chunks_exact(2) {
                let Ok(key) = pair[0].as_i64() else {
                    continue;
                };
                match doc.resolve(&pair[1]) {
                    Object::Array(items) => {
                        let slots = items
                            .iter()
                            .map(|item| item.as_reference().ok())
                            .collect();
                        if let Ok(id) = pair[1].as_reference() {
                            self.array_ids.insert(key, id);
                        }
                        self.entries.insert(key, ParentTreeEntry::Slots(slots));
                    }
                    Object::Dictionary(_) => {
                        if let Ok(id) = pair[1].as_reference() {
                            self.entries.insert(key, ParentTreeEntry::Direct(id));
                        }
                    }
                    _ => {}
                }
            }
        }
        if let Ok(Object::Array(kids)) = node.get(b"Kids").map(|o| doc.resolve(o)) {
            for kid in kids {
                if let Ok(id) = kid.as_reference() {
                    if !visited.insert(id) {
                        continue;
                    }
                }
                if let Some(child) = doc.resolve_dict(kid) {
                    self.read_node(doc, child, depth + 1, visited);
                }
            }
        }
    }

    pub fn get(&self, key: i64) -> Option<&ParentTreeEntry> {
        self.entries.get(&key)
    }

    pub fn contains_key(&self, key: i64) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One above the largest key in use.
    pub fn next_key(&self) -> i64 {
        self.entries.keys().next_back().map_or(0, |k| k + 1)
    }

    /// Make sure `key` has a (possibly empty) slot array.
    pub fn reserve(&mut self, key: i64) {
        self.entries
            .entry(key)
            .or_insert_with(|| ParentTreeEntry::Slots(Vec::new()));
    }

    /// Point slot `mcid` of page key `key` at `element`, growing the array
    /// with nulls as needed. Returns `true` only when an empty slot was filled;
    /// an MCID above [`MAX_MCID`] is skipped.
    pub fn assign(&mut self, key: i64, mcid: u32, element: ObjectId) -> bool {
        if mcid > MAX_MCID {
            warn!(key, mcid, "MCID out of range, parent-tree slot skipped");
            return false;
        }
        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| ParentTreeEntry::Slots(Vec::new()));
        let ParentTreeEntry::Slots(slots) = entry else {
            return false;
        };
        let index = mcid as usize;
        if slots.len() <= index {
            slots.resize(index + 1, None);
        }
        if slots[index].is_some() {
            return false;
        }
        slots[index] = Some(element);
        true
    }

    /// Add a direct entry unless the key is taken.
    pub fn set_direct(&mut self, key: i64, element: ObjectId) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, ParentTreeEntry::Direct(element));
        true
    }

    /// Write the tree back as a single flat `/Nums` node and update
    /// `/ParentTreeNextKey`.
    pub fn write(&self, doc: &mut PdfDocument, tree: &StructTree) -> Result<(), PdfError> {
        let mut nums = Vec::with_capacity(self.entries.len() * 2);
        for (key, entry) in &self.entries {
            nums.push(Object::Integer(*key));
            match entry {
                ParentTreeEntry::Slots(slots) => {
                    let array: Vec<Object> = slots
                        .iter()
                        .map(|slot| slot.map_or(Object::Null, Object::Reference))
                        .collect();
                    let id = match self.array_ids.get(key) {
                        Some(id) => {
                            *doc.inner_mut()
                                .get_object_mut(*id)
                                .map_err(|e| PdfError::StructureError(e.to_string()))? =
                                Object::Array(array);
                            *id
                        }
                        None => doc.add_object(Object::Array(array)),
                    };
                    nums.push(Object::Reference(id));
                }
                ParentTreeEntry::Direct(id) => nums.push(Object::Reference(*id)),
            }
        }

        let existing = doc
            .dict(tree.root_id())?
            .get(b"ParentTree")
            .and_then(Object::as_reference)
            .ok();
        let node = dictionary! { "Nums" => nums };
        let node_id = match existing {
            Some(id) => {
                *doc.dict_mut(id)? = node;
                id
            }
            None => doc.add_object(node),
        };
        let root = doc.dict_mut(tree.root_id())?;
        root.set("ParentTree", node_id);
        root.set("ParentTreeNextKey", self.next_key());
        Ok(())
    }
}

/// The parent-tree key of a page, assigning `/StructParents` when the
/// page has none: the page index if that key is free, else the next key.
pub fn page_key(doc: &mut PdfDocument, index: usize, tree: &mut ParentTree) -> Result<i64, PdfError> {
    if let Ok(key) = doc.page_dict(index)?.get(b"StructParents").and_then(Object::as_i64) {
        return Ok(key);
    }
    let preferred = index as i64;
    let key = if tree.contains_key(preferred) {
        tree.next_key()
    } else {
        preferred
    };
    tree.reserve(key);
    doc.page_dict_mut(index)?.set("StructParents", key);
    Ok(key)
}

/// Merge every (page, MCID) owned by an element in the tree into the
/// parent tree. Returns the number of slots filled.
pub fn merge_parent_tree(doc: &mut PdfDocument, tree: &StructTree) -> Result<usize, PdfError> {
    let mut parent_tree = ParentTree::read(doc, tree);
    let mut filled = 0;
    for element in tree.elements(doc) {
        for (mcid, page) in element.mcids() {
            let Some(index) = page.and_then(|p| doc.page_index(p)) else {
                continue;
            };
            let key = page_key(doc, index, &mut parent_tree)?;
            if parent_tree.assign(key, mcid, element.id) {
                filled += 1;
            }
        }
    }
    parent_tree.write(doc, tree)?;
    debug!(filled, entries = parent_tree.len(), "merged parent tree");
    Ok(filled)
}
