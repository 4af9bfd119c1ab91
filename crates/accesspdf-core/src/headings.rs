//! Font-size statistics used to promote paragraphs to headings.
//!
//! The body size is the most frequent effective font size among all text
//! runs. Sizes strictly above `1.15 × body` are ranked from largest to
//! smallest into heading levels 1..=6.

use unicode_normalization::UnicodeNormalization;

/// Ratio a run's size must exceed, relative to the body size, to count as a heading size.
pub const HEADING_SIZE_RATIO: f64 = 1.15;

/// Minimum length of the shorter string for a prefix match to count.
const MIN_PREFIX_MATCH_LEN: usize = 4;

/// A run of shown text with the font it was rendered in.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Base font name when resolvable, otherwise the resource name.
    pub font_name: String,
    /// Effective size: declared `Tf` size times the text matrix vertical scale.
    pub size: f64,
    pub bold: bool,
    pub page_index: usize,
}

/// Whether a font name indicates a bold weight.
pub fn is_bold_font(font_name: &str) -> bool {
    let lower = font_name.to_ascii_lowercase();
    ["bold", "black", "heavy", "demi"]
        .iter()
        .any(|w| lower.contains(w))
}

/// Size key with 0.01pt resolution so equal sizes compare equal after
/// floating-point matrix math.
fn size_key(size: f64) -> i64 {
    (size * 100.0).round() as i64
}

/// The most frequent positive font size. Ties go to the size seen first.
pub fn body_font_size(runs: &[TextRun]) -> Option<f64> {
    let mut counts: Vec<(i64, f64, usize)> = Vec::new();
    for run in runs.iter().filter(|r| r.size > 0.0) {
        let key = size_key(run.size);
        match counts.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => entry.2 += 1,
            None => counts.push((key, run.size, 1)),
        }
    }
    let mut best: Option<(f64, usize)> = None;
    for (_, size, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((size, count));
        }
    }
    best.map(|(size, _)| size)
}

/// Distinct sizes above the heading threshold, largest first, paired with
/// their heading level.
pub fn heading_levels(runs: &[TextRun], body_size: f64) -> Vec<(f64, u8)> {
    let threshold = body_size * HEADING_SIZE_RATIO;
    let mut sizes: Vec<f64> = Vec::new();
    for run in runs.iter().filter(|r| r.size > threshold) {
        if !sizes.iter().any(|s| size_key(*s) == size_key(run.size)) {
            sizes.push(run.size);
        }
    }
    sizes.sort_by(|a, b| b.total_cmp(a));
    sizes
        .into_iter()
        .enumerate()
        .map(|(i, size)| (size, (i + 1).min(6) as u8))
        .collect()
}

/// Collapse whitespace, apply NFKC, and lowercase.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text.nfkc().collect();
    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalized heading texts mapped to heading levels, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadingMap {
    entries: Vec<(String, u8)>,
}

impl HeadingMap {
    /// Build the map from text runs.
    ///
    /// Falls back to bold runs at or above body size (as level 2) when no
    /// size exceeds the heading threshold.
    pub fn from_runs(runs: &[TextRun]) -> Self {
        let mut map = HeadingMap::default();
        let Some(body) = body_font_size(runs) else {
            return map;
        };
        let levels = heading_levels(runs, body);

        if levels.is_empty() {
            for run in runs.iter().filter(|r| r.bold && r.size >= body) {
                map.insert(&run.text, 2);
            }
            return map;
        }

        for run in runs {
            if let Some((_, level)) = levels
                .iter()
                .find(|(size, _)| size_key(*size) == size_key(run.size))
            {
                map.insert(&run.text, *level);
            }
        }
        map
    }

    fn insert(&mut self, text: &str, level: u8) {
        let norm = normalize_text(text);
        if norm.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(t, _)| *t == norm) {
            Some(entry) => entry.1 = level,
            None => self.entries.push((norm, level)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Level for a paragraph's text: an exact normalized match, or a prefix
    /// match in either direction when the shorter string has at least four
    /// characters.
    pub fn match_text(&self, text: &str) -> Option<u8> {
        let norm = normalize_text(text);
        if norm.is_empty() {
            return None;
        }
        for (heading, level) in &self.entries {
            if *heading == norm {
                return Some(*level);
            }
            let shorter = heading.chars().count().min(norm.chars().count());
            if shorter >= MIN_PREFIX_MATCH_LEN
                && (norm.starts_with(heading.as_str()) || heading.starts_with(norm.as_str()))
            {
                return Some(*level);
            }
        }
        None
    }
}

/// Warnings for headings that skip levels going deeper (H1 then H3).
pub fn nesting_warnings(levels: &[u8]) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut last = 0u8;
    for &level in levels {
        if last > 0 && level > last + 1 {
            warnings.push(format!("Heading nesting skip: H{last} -> H{level}"));
        }
        last = level;
    }
    warnings
}
