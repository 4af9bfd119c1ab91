//! Ruled-grid table detection.
//!
//! A page is taken to hold a table when its ruling segments cluster into at
//! least three distinct horizontal positions and three distinct vertical
//! positions, i.e. at least two rows and two columns of cells.

/// Default clustering tolerance in PDF units.
pub const DEFAULT_GRID_TOLERANCE: f64 = 3.0;

/// Minimum length for a stroked segment to count as a ruling line.
const MIN_RULING_LENGTH: f64 = 20.0;
/// Maximum off-axis deviation for a segment to count as axis-aligned.
const MAX_SKEW: f64 = 2.0;
/// Minimum rectangle width and height for `re` edges to count.
const MIN_RECT_WIDTH: f64 = 20.0;
const MIN_RECT_HEIGHT: f64 = 5.0;

/// Minimum number of distinct positions along each axis.
const MIN_CLUSTERS: usize = 3;

/// An axis-aligned ruling line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Horizontal and vertical rulings collected from one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rulings {
    pub horizontal: Vec<Segment>,
    pub vertical: Vec<Segment>,
}

impl Rulings {
    /// Classify a stroked `m`/`l` segment from `(x0, y0)` to `(x1, y1)`.
    /// Short or skewed segments are ignored.
    pub fn add_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        if dy < MAX_SKEW && dx > MIN_RULING_LENGTH {
            self.horizontal.push(Segment {
                x0: x0.min(x1),
                y0,
                x1: x0.max(x1),
                y1,
            });
        } else if dx < MAX_SKEW && dy > MIN_RULING_LENGTH {
            self.vertical.push(Segment {
                x0,
                y0: y0.min(y1),
                x1,
                y1: y0.max(y1),
            });
        }
    }

    /// Add the four edges of an `re` rectangle.
    pub fn add_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if w <= MIN_RECT_WIDTH || h <= MIN_RECT_HEIGHT {
            return;
        }
        self.horizontal.push(Segment { x0: x, y0: y, x1: x + w, y1: y });
        self.horizontal.push(Segment {
            x0: x,
            y0: y + h,
            x1: x + w,
            y1: y + h,
        });
        self.vertical.push(Segment { x0: x, y0: y, x1: x, y1: y + h });
        self.vertical.push(Segment {
            x0: x + w,
            y0: y,
            x1: x + w,
            y1: y + h,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.horizontal.is_empty() && self.vertical.is_empty()
    }
}

/// A detected grid: sorted distinct ruling positions along each axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid {
    pub page_index: usize,
    /// Horizontal ruling y-positions, ascending.
    pub row_positions: Vec<f64>,
    /// Vertical ruling x-positions, ascending.
    pub col_positions: Vec<f64>,
}

impl TableGrid {
    pub fn row_count(&self) -> usize {
        self.row_positions.len().saturating_sub(1)
    }

    pub fn col_count(&self) -> usize {
        self.col_positions.len().saturating_sub(1)
    }
}

/// Snap values to multiples of `tolerance` and return the distinct
/// positions in ascending order.
pub fn cluster_positions(values: impl IntoIterator<Item = f64>, tolerance: f64) -> Vec<f64> {
    let mut snapped: Vec<f64> = values
        .into_iter()
        .map(|v| (v / tolerance).round() * tolerance)
        .collect();
    snapped.sort_by(f64::total_cmp);
    snapped.dedup_by(|a, b| (*a - *b).abs() < f64::EPSILON);
    snapped
}

/// Find a grid among a page's rulings.
pub fn find_grid(rulings: &Rulings, page_index: usize, tolerance: f64) -> Option<TableGrid> {
    if rulings.horizontal.len() < 2 || rulings.vertical.len() < 2 {
        return None;
    }
    let row_positions = cluster_positions(rulings.horizontal.iter().map(|s| s.y0), tolerance);
    let col_positions = cluster_positions(rulings.vertical.iter().map(|s| s.x0), tolerance);
    if row_positions.len() < MIN_CLUSTERS || col_positions.len() < MIN_CLUSTERS {
        return None;
    }
    Some(TableGrid {
        page_index,
        row_positions,
        col_positions,
    })
}
