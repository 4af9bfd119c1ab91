//! Content-stream replay.
//!
//! Walks a tokenized page while tracking the graphics and text state and
//! the stack of open marked-content regions, answering questions per MCID:
//! what text it shows, where it first draws, which fonts and sizes it uses,
//! and which XObjects it invokes. Also collects ruling segments for table
//! detection.

use std::collections::BTreeMap;

use accesspdf_core::geometry::{Ctm, Point};
use accesspdf_core::{Rulings, TextRun, is_bold_font};

use crate::document::decode_win_ansi;
use crate::text_state::GraphicsState;
use crate::tokenizer::{Operand, Operator};

/// TJ adjustments more negative than this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f64 = -250.0;

/// A text run together with the MCID region it was shown in.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedRun {
    pub mcid: Option<u32>,
    pub run: TextRun,
}

/// Decoded text shown by one text-showing operator.
pub fn shown_text(op: &Operator) -> String {
    let strings = match op.name.as_str() {
        "Tj" | "'" => op.operands.first(),
        "\"" => op.operands.get(2),
        "TJ" => {
            let mut text = String::new();
            if let Some(Operand::Array(items)) = op.operands.first() {
                for item in items {
                    match item {
                        Operand::LiteralString(b) | Operand::HexString(b) => {
                            text.push_str(&decode_win_ansi(b));
                        }
                        other => {
                            if other.as_f64().is_some_and(|n| n < TJ_SPACE_THRESHOLD)
                                && !text.ends_with(' ')
                            {
                                text.push(' ');
                            }
                        }
                    }
                }
            }
            return text;
        }
        _ => None,
    };
    strings
        .and_then(Operand::as_string_bytes)
        .map(decode_win_ansi)
        .unwrap_or_default()
}

/// Tracks open `BMC`/`BDC` regions and the MCID currently in effect.
#[derive(Debug, Default)]
struct MarkedStack {
    open: Vec<Option<u32>>,
}

impl MarkedStack {
    /// Update for a marked-content operator. Returns `true` if `op` was one.
    fn apply(&mut self, op: &Operator) -> bool {
        match op.name.as_str() {
            "BMC" | "BDC" => {
                self.open.push(op.mcid());
                true
            }
            "EMC" => {
                self.open.pop();
                true
            }
            _ => false,
        }
    }

    /// Innermost MCID among the open regions.
    fn current(&self) -> Option<u32> {
        self.open.iter().rev().find_map(|m| *m)
    }
}

/// Apply a state-changing operator. Returns `true` if it moved the text position.
fn apply_state(gs: &mut GraphicsState, op: &Operator) -> bool {
    let n = |i| op.number(i).unwrap_or(0.0);
    match op.name.as_str() {
        "q" => gs.save(),
        "Q" => gs.restore(),
        "cm" if op.operands.len() == 6 => {
            gs.concat_matrix(Ctm::new(n(0), n(1), n(2), n(3), n(4), n(5)));
        }
        "BT" => gs.text.begin_text(),
        "ET" => gs.text.end_text(),
        "Tf" => {
            let name = op
                .operands
                .first()
                .and_then(Operand::as_name)
                .unwrap_or_default()
                .to_string();
            gs.text.set_font(name, n(1));
        }
        "TL" => gs.text.leading = n(0),
        "Tm" if op.operands.len() == 6 => {
            gs.text.set_text_matrix(n(0), n(1), n(2), n(3), n(4), n(5));
            return true;
        }
        "Td" => {
            gs.text.move_text_position(n(0), n(1));
            return true;
        }
        "TD" => {
            gs.text.move_text_position_and_set_leading(n(0), n(1));
            return true;
        }
        "T*" | "'" | "\"" => {
            gs.text.move_to_next_line();
            return true;
        }
        _ => {}
    }
    false
}

/// Text shown inside each MCID region, in stream order.
///
/// Separate lines within one region are joined with a space.
pub fn mcid_texts(ops: &[Operator]) -> BTreeMap<u32, String> {
    let mut texts: BTreeMap<u32, String> = BTreeMap::new();
    let mut marked = MarkedStack::default();
    let mut line_break = false;

    for op in ops {
        if marked.apply(op) {
            continue;
        }
        if matches!(op.name.as_str(), "Td" | "TD" | "T*" | "Tm" | "BT") {
            line_break = true;
        }
        if !op.shows_text() {
            continue;
        }
        let Some(mcid) = marked.current() else {
            continue;
        };
        let piece = shown_text(op);
        let new_line = line_break || matches!(op.name.as_str(), "'" | "\"");
        let text = texts.entry(mcid).or_default();
        if new_line
            && !text.is_empty()
            && !text.ends_with(' ')
            && !piece.starts_with(' ')
        {
            text.push(' ');
        }
        text.push_str(&piece);
        line_break = false;
    }

    texts
        .into_iter()
        .map(|(mcid, text)| (mcid, text.trim().to_string()))
        .collect()
}

/// First non-origin drawing position inside each MCID region.
///
/// Text regions report the text origin after positioning operators and at
/// each text-showing operator; `Do` reports the CTM translation.
pub fn mcid_positions(ops: &[Operator]) -> BTreeMap<u32, Point> {
    let mut positions = BTreeMap::new();
    let mut marked = MarkedStack::default();
    let mut gs = GraphicsState::new();

    for op in ops {
        if marked.apply(op) {
            continue;
        }
        let moved = apply_state(&mut gs, op);
        let Some(mcid) = marked.current() else {
            continue;
        };
        if positions.contains_key(&mcid) {
            continue;
        }
        let point = if moved || op.shows_text() {
            Some(gs.text.origin(&gs.ctm))
        } else if op.is("Do") {
            Some(gs.ctm.origin())
        } else {
            None
        };
        if let Some(point) = point.filter(|p| !p.is_origin()) {
            positions.insert(mcid, point);
        }
    }

    positions
}

/// Text runs with effective font sizes.
///
/// `base_font` maps a font resource name to its `/BaseFont`; the resource
/// name is used when it returns `None`.
pub fn text_runs(
    ops: &[Operator],
    page_index: usize,
    base_font: impl Fn(&str) -> Option<String>,
) -> Vec<PositionedRun> {
    let mut runs = Vec::new();
    let mut marked = MarkedStack::default();
    let mut gs = GraphicsState::new();
    let mut font_cache: BTreeMap<String, String> = BTreeMap::new();

    for op in ops {
        if marked.apply(op) {
            continue;
        }
        apply_state(&mut gs, op);
        if !op.shows_text() {
            continue;
        }
        let text = shown_text(op);
        if text.trim().is_empty() {
            continue;
        }
        let resource = gs.text.font_name.clone();
        let font_name = font_cache
            .entry(resource.clone())
            .or_insert_with(|| base_font(&resource).unwrap_or(resource))
            .clone();
        runs.push(PositionedRun {
            mcid: marked.current(),
            run: TextRun {
                text,
                bold: is_bold_font(&font_name),
                font_name,
                size: gs.text.effective_font_size(&gs.ctm),
                page_index,
            },
        });
    }

    runs
}

/// XObject names invoked inside each MCID region.
pub fn mcid_xobjects(ops: &[Operator]) -> BTreeMap<u32, Vec<String>> {
    let mut found: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    let mut marked = MarkedStack::default();
    for op in ops {
        if marked.apply(op) {
            continue;
        }
        if let (Some(name), Some(mcid)) = (op.xobject_name(), marked.current()) {
            found.entry(mcid).or_default().push(name.to_string());
        }
    }
    found
}

/// Line and rectangle segments in user space, for ruled-table detection.
pub fn ruling_segments(ops: &[Operator]) -> Rulings {
    let mut rulings = Rulings::default();
    let mut gs = GraphicsState::new();
    let mut current: Option<Point> = None;

    for op in ops {
        let n = |i| op.number(i).unwrap_or(0.0);
        match op.name.as_str() {
            "m" if op.operands.len() >= 2 => {
                current = Some(gs.ctm.transform_point(Point::new(n(0), n(1))));
            }
            "l" if op.operands.len() >= 2 => {
                let to = gs.ctm.transform_point(Point::new(n(0), n(1)));
                if let Some(from) = current {
                    rulings.add_line(from.x, from.y, to.x, to.y);
                }
                current = Some(to);
            }
            "re" if op.operands.len() >= 4 => {
                let p0 = gs.ctm.transform_point(Point::new(n(0), n(1)));
                let p1 = gs.ctm.transform_point(Point::new(n(0) + n(2), n(1) + n(3)));
                rulings.add_rect(
                    p0.x.min(p1.x),
                    p0.y.min(p1.y),
                    (p1.x - p0.x).abs(),
                    (p1.y - p0.y).abs(),
                );
                current = None;
            }
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" => current = None,
            _ => {
                apply_state(&mut gs, op);
            }
        }
    }

    rulings
}
