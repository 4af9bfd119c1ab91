//! Marked-content region detection and splicing.
//!
//! Text objects that show text become `/P` regions and image `Do`
//! invocations become `/Figure` regions, each wrapped in
//! `BDC <tag> <</MCID n>> ... EMC` with MCIDs counted up from a seed.

use crate::error::BackendError;
use crate::tokenizer::{Operand, Operator};

/// What a new marked-content region encloses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// A `BT ... ET` block showing text, tagged `/P`.
    Text,
    /// A single image `Do`, tagged `/Figure`.
    Image,
}

impl RegionKind {
    pub fn tag(&self) -> &'static str {
        match self {
            RegionKind::Text => "P",
            RegionKind::Image => "Figure",
        }
    }
}

/// A region inserted into a content stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedRegion {
    pub kind: RegionKind,
    pub mcid: u32,
    /// XObject name for image regions.
    pub xobject: Option<String>,
}

/// Rewritten operators plus the regions added to them, in stream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaggedContent {
    pub ops: Vec<Operator>,
    pub regions: Vec<TaggedRegion>,
}

impl TaggedContent {
    pub fn is_unchanged(&self) -> bool {
        self.regions.is_empty()
    }
}

/// `BDC` opening a region with the given tag and MCID.
pub fn begin_marked_content(tag: &str, mcid: u32) -> Operator {
    Operator::new(
        "BDC",
        vec![
            Operand::Name(tag.to_string()),
            Operand::Dictionary(vec![("MCID".to_string(), Operand::Integer(i64::from(mcid)))]),
        ],
    )
}

pub fn end_marked_content() -> Operator {
    Operator::new("EMC", Vec::new())
}

/// All MCIDs carried by `BDC` operators, in stream order.
pub fn mcids(ops: &[Operator]) -> Vec<u32> {
    ops.iter().filter_map(Operator::mcid).collect()
}

/// First MCID free for new regions: one above the largest in use, else 0.
pub fn next_mcid(ops: &[Operator]) -> u32 {
    ops.iter()
        .filter_map(Operator::mcid)
        .max()
        .map_or(0, |m| m.saturating_add(1))
}

/// Verify every `BMC`/`BDC` has a matching `EMC`.
pub fn check_nesting(ops: &[Operator]) -> Result<(), BackendError> {
    let mut depth = 0usize;
    for (i, op) in ops.iter().enumerate() {
        match op.name.as_str() {
            "BMC" | "BDC" => depth += 1,
            "EMC" => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    BackendError::Interpreter(format!("EMC without matching BDC at operator {i}"))
                })?;
            }
            _ => {}
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(BackendError::Interpreter(format!(
            "{depth} marked-content region(s) left open"
        )))
    }
}

/// Tag an untagged content stream.
///
/// Each `BT ... ET` block containing a text-showing operator is wrapped as
/// a `/P` region, and each `Do` of a name for which `is_image` holds as a
/// `/Figure` region. Content already inside a marked-content region that
/// carries an MCID or marks an artifact is left alone, as are text blocks
/// that contain their own MCID regions.
pub fn tag_content(
    ops: &[Operator],
    is_image: impl Fn(&str) -> bool,
    first_mcid: u32,
) -> TaggedContent {
    let mut out = Vec::with_capacity(ops.len() + 8);
    let mut regions = Vec::new();
    let mut mcid = first_mcid;
    // One entry per open BMC/BDC: whether it forbids nested tagging.
    let mut enclosing: Vec<bool> = Vec::new();
    let mut text_block: Option<Vec<Operator>> = None;

    for op in ops {
        if let Some(block) = text_block.as_mut() {
            block.push(op.clone());
            if op.is("ET") {
                let block = text_block.take().unwrap_or_default();
                let blocked = enclosing.iter().any(|b| *b);
                let shows_text = block.iter().any(Operator::shows_text);
                let has_own_regions = block
                    .iter()
                    .any(|o| o.is("BMC") || o.is("BDC") || o.is("EMC"));
                if shows_text && !blocked && !has_own_regions {
                    out.push(begin_marked_content(RegionKind::Text.tag(), mcid));
                    out.extend(block);
                    out.push(end_marked_content());
                    regions.push(TaggedRegion {
                        kind: RegionKind::Text,
                        mcid,
                        xobject: None,
                    });
                    mcid += 1;
                } else {
                    out.extend(block);
                }
            }
            continue;
        }

        match op.name.as_str() {
            "BT" => text_block = Some(vec![op.clone()]),
            "BMC" | "BDC" => {
                let forbids = op.mcid().is_some() || op.marked_content_tag() == Some("Artifact");
                enclosing.push(forbids);
                out.push(op.clone());
            }
            "EMC" => {
                enclosing.pop();
                out.push(op.clone());
            }
            "Do" => match op.xobject_name() {
                Some(name) if is_image(name) && !enclosing.iter().any(|b| *b) => {
                    out.push(begin_marked_content(RegionKind::Image.tag(), mcid));
                    out.push(op.clone());
                    out.push(end_marked_content());
                    regions.push(TaggedRegion {
                        kind: RegionKind::Image,
                        mcid,
                        xobject: Some(name.to_string()),
                    });
                    mcid += 1;
                }
                _ => out.push(op.clone()),
            },
            _ => out.push(op.clone()),
        }
    }

    // An unterminated text object passes through untagged.
    if let Some(block) = text_block {
        out.extend(block);
    }

    TaggedContent { ops: out, regions }
}

/// Wrap selected `Do` invocations as `/Figure` regions.
///
/// `select` receives the XObject name and the tags of the marked-content
/// regions enclosing the invocation, outermost first.
pub fn wrap_do_invocations(
    ops: &[Operator],
    first_mcid: u32,
    mut select: impl FnMut(&str, &[String]) -> bool,
) -> TaggedContent {
    let mut out = Vec::with_capacity(ops.len());
    let mut regions = Vec::new();
    let mut mcid = first_mcid;
    let mut enclosing: Vec<String> = Vec::new();

    for op in ops {
        match op.name.as_str() {
            "BMC" | "BDC" => {
                enclosing.push(op.marked_content_tag().unwrap_or_default().to_string());
                out.push(op.clone());
            }
            "EMC" => {
                enclosing.pop();
                out.push(op.clone());
            }
            "Do" => match op.xobject_name() {
                Some(name) if select(name, &enclosing) => {
                    out.push(begin_marked_content(RegionKind::Image.tag(), mcid));
                    out.push(op.clone());
                    out.push(end_marked_content());
                    regions.push(TaggedRegion {
                        kind: RegionKind::Image,
                        mcid,
                        xobject: Some(name.to_string()),
                    });
                    mcid += 1;
                }
                _ => out.push(op.clone()),
            },
            _ => out.push(op.clone()),
        }
    }

    TaggedContent { ops: out, regions }
}
