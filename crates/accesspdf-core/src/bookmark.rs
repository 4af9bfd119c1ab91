//! Document outline (bookmark) types and the heading-to-outline nesting
//! algorithm.

/// A heading discovered in the structure tree, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingEntry {
    /// Heading level 1..=6.
    pub level: u8,
    pub text: String,
    /// 0-indexed page the heading sits on.
    pub page_index: usize,
}

/// A node of the outline tree to be written under `/Outlines`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineNode {
    pub title: String,
    pub page_index: usize,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    /// Number of descendants (the `/Count` of an open outline item).
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }
}

/// A flattened outline entry, used to compare an existing outline with a
/// freshly computed one.
#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    pub title: String,
    /// Nesting depth (0-indexed). Top-level bookmarks have level 0.
    pub level: usize,
    /// The 0-indexed destination page number, if resolvable.
    pub page_number: Option<usize>,
}

/// Nest headings into an outline with a level-tracked stack.
///
/// For each heading, entries are popped while the top of the stack has a
/// level greater than or equal to the heading's; the heading then becomes a
/// child of whatever remains on top (or a root when the stack is empty).
pub fn build_outline(headings: &[HeadingEntry]) -> Vec<OutlineNode> {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); headings.len()];
    let mut roots = Vec::new();
    let mut stack: Vec<(u8, usize)> = Vec::new();

    for (i, heading) in headings.iter().enumerate() {
        while stack.last().is_some_and(|(level, _)| *level >= heading.level) {
            stack.pop();
        }
        match stack.last() {
            Some((_, parent)) => children[*parent].push(i),
            None => roots.push(i),
        }
        stack.push((heading.level, i));
    }

    fn assemble(idx: usize, headings: &[HeadingEntry], children: &[Vec<usize>]) -> OutlineNode {
        OutlineNode {
            title: headings[idx].text.clone(),
            page_index: headings[idx].page_index,
            children: children[idx]
                .iter()
                .map(|&c| assemble(c, headings, children))
                .collect(),
        }
    }

    roots
        .into_iter()
        .map(|r| assemble(r, headings, &children))
        .collect()
}

/// Flatten an outline depth-first into [`Bookmark`]s.
pub fn flatten_outline(nodes: &[OutlineNode]) -> Vec<Bookmark> {
    fn walk(nodes: &[OutlineNode], level: usize, out: &mut Vec<Bookmark>) {
        for node in nodes {
            out.push(Bookmark {
                title: node.title.clone(),
                level,
                page_number: Some(node.page_index),
            });
            walk(&node.children, level + 1, out);
        }
    }
    let mut out = Vec::new();
    walk(nodes, 0, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(level: u8, text: &str) -> HeadingEntry {
        HeadingEntry {
            level,
            text: text.to_string(),
            page_index: 0,
        }
    }

    #[test]
    fn flat_headings_are_siblings() {
        let outline = build_outline(&[h(1, "A"), h(1, "B"), h(1, "C")]);
        assert_eq!(outline.len(), 3);
        assert!(outline.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn nested_headings() {
        let outline = build_outline(&[
            h(1, "Intro"),
            h(2, "Background"),
            h(3, "Detail"),
            h(2, "Scope"),
            h(1, "Methods"),
        ]);
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].title, "Intro");
        assert_eq!(outline[0].children.len(), 2);
        assert_eq!(outline[0].children[0].children[0].title, "Detail");
        assert_eq!(outline[0].descendant_count(), 3);
        assert_eq!(outline[1].title, "Methods");
    }

    #[test]
    fn skipped_levels_still_nest_under_nearest_lower_level() {
        let outline = build_outline(&[h(1, "Top"), h(3, "Deep"), h(2, "Mid")]);
        assert_eq!(outline.len(), 1);
        let titles: Vec<_> = outline[0].children.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Deep", "Mid"]);
    }

    #[test]
    fn leading_subheading_becomes_root() {
        let outline = build_outline(&[h(2, "Preface"), h(1, "Chapter")]);
        assert_eq!(outline.len(), 2);
    }

    #[test]
    fn flatten_tracks_depth() {
        let outline = build_outline(&[h(1, "A"), h(2, "A.1"), h(1, "B")]);
        let flat = flatten_outline(&outline);
        let levels: Vec<_> = flat.iter().map(|b| b.level).collect();
        assert_eq!(levels, vec![0, 1, 0]);
        assert_eq!(flat[1].title, "A.1");
    }

    #[test]
    fn empty_input_gives_empty_outline() {
        assert!(build_outline(&[]).is_empty());
    }
}
