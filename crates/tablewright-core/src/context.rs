//! Table region context: a memoized geometric snapshot of one candidate
//! table bounding box.
//!
//! A [`TableContext`] is a pure function of (page, bounding box). Every
//! derived view — clipped words, clipped segments, row grouping, adaptive
//! medians — is computed once on first access and cached for the lifetime
//! of the context. The context is never mutated after construction.

use std::sync::OnceLock;

use crate::geometry::{BBox, median};
use crate::input::{PageContent, Segment, TextBlock, Word};

/// Geometric/statistical snapshot of one candidate table region.
///
/// Read-only for the lifetime of one extraction. All derived state is
/// memoized; no accessor can observe partially-initialized state.
pub struct TableContext<'a> {
    page: &'a PageContent,
    bbox: BBox,
    words: OnceLock<Vec<Word>>,
    segments: OnceLock<Vec<Segment>>,
    blocks: OnceLock<Vec<TextBlock>>,
    rows: OnceLock<Vec<Vec<Word>>>,
    median_word_height: OnceLock<f64>,
    median_word_width: OnceLock<f64>,
    median_word_gap: OnceLock<f64>,
    median_line_thickness: OnceLock<Option<f64>>,
}

impl<'a> TableContext<'a> {
    /// Create a context for the given page and bounding box.
    ///
    /// Construction is cheap; derived views are computed lazily.
    pub fn new(page: &'a PageContent, bbox: BBox) -> Self {
        Self {
            page,
            bbox,
            words: OnceLock::new(),
            segments: OnceLock::new(),
            blocks: OnceLock::new(),
            rows: OnceLock::new(),
            median_word_height: OnceLock::new(),
            median_word_width: OnceLock::new(),
            median_word_gap: OnceLock::new(),
            median_line_thickness: OnceLock::new(),
        }
    }

    /// The table bounding box.
    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// The underlying page content (unclipped).
    pub fn page(&self) -> &PageContent {
        self.page
    }

    /// Page width.
    pub fn page_width(&self) -> f64 {
        self.page.width
    }

    /// Page height.
    pub fn page_height(&self) -> f64 {
        self.page.height
    }

    /// Word tokens whose center lies inside the box.
    pub fn words(&self) -> &[Word] {
        self.words.get_or_init(|| {
            self.page
                .words
                .iter()
                .filter(|w| {
                    self.bbox
                        .contains_point(w.bbox.x_center(), w.bbox.y_center())
                })
                .cloned()
                .collect()
        })
    }

    /// Drawing-line segments clipped to the box.
    ///
    /// Segments entirely outside the box are discarded; segments crossing
    /// the box edge are cut at the edge.
    pub fn segments(&self) -> &[Segment] {
        self.segments.get_or_init(|| {
            self.page
                .segments
                .iter()
                .filter_map(|s| clip_segment(s, &self.bbox))
                .collect()
        })
    }

    /// Text blocks intersecting the box, with their spans filtered to those
    /// intersecting the box.
    pub fn blocks(&self) -> &[TextBlock] {
        self.blocks.get_or_init(|| {
            self.page
                .blocks
                .iter()
                .filter(|b| b.bbox.overlap_area(&self.bbox) > 0.0)
                .map(|b| TextBlock {
                    bbox: b.bbox,
                    spans: b
                        .spans
                        .iter()
                        .filter(|s| s.bbox.overlap_area(&self.bbox) > 0.0)
                        .cloned()
                        .collect(),
                })
                .collect()
        })
    }

    /// Words grouped into visual rows, top-to-bottom.
    ///
    /// Words are clustered by vertical center within half the median word
    /// height; each row is sorted left-to-right.
    pub fn rows(&self) -> &[Vec<Word>] {
        self.rows.get_or_init(|| {
            let mut words: Vec<Word> = self.words().to_vec();
            if words.is_empty() {
                return Vec::new();
            }
            words.sort_by(|a, b| {
                a.bbox
                    .y_center()
                    .partial_cmp(&b.bbox.y_center())
                    .unwrap()
                    .then_with(|| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap())
            });

            let tolerance = (self.median_word_height() / 2.0).max(1e-6);
            let mut rows: Vec<Vec<Word>> = Vec::new();
            let mut row_center = f64::NEG_INFINITY;
            for word in words {
                let y = word.bbox.y_center();
                if rows.is_empty() || (y - row_center).abs() > tolerance {
                    row_center = y;
                    rows.push(vec![word]);
                } else {
                    rows.last_mut().unwrap().push(word);
                }
            }
            for row in &mut rows {
                row.sort_by(|a, b| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap());
            }
            rows
        })
    }

    /// Median height of words in the box (0.0 when there are no words).
    pub fn median_word_height(&self) -> f64 {
        *self.median_word_height.get_or_init(|| {
            let heights: Vec<f64> = self.words().iter().map(|w| w.bbox.height()).collect();
            median(&heights).unwrap_or(0.0)
        })
    }

    /// Median width of words in the box (0.0 when there are no words).
    pub fn median_word_width(&self) -> f64 {
        *self.median_word_width.get_or_init(|| {
            let widths: Vec<f64> = self.words().iter().map(|w| w.bbox.width()).collect();
            median(&widths).unwrap_or(0.0)
        })
    }

    /// Median horizontal gap between adjacent words within a row
    /// (0.0 when no positive gap exists).
    pub fn median_word_gap(&self) -> f64 {
        *self.median_word_gap.get_or_init(|| {
            let mut gaps = Vec::new();
            for row in self.rows() {
                for pair in row.windows(2) {
                    let gap = pair[1].bbox.x0 - pair[0].bbox.x1;
                    if gap > 0.0 {
                        gaps.push(gap);
                    }
                }
            }
            median(&gaps).unwrap_or(0.0)
        })
    }

    /// Median stroke width of line segments inside the box.
    ///
    /// `None` exactly when no line primitive survives clipping — that
    /// absence means "no ruled-line structure" and is itself a signal
    /// several methods key their activation on.
    pub fn median_line_thickness(&self) -> Option<f64> {
        *self.median_line_thickness.get_or_init(|| {
            let widths: Vec<f64> = self.segments().iter().map(|s| s.width).collect();
            median(&widths)
        })
    }

    /// Whether the box contains any ruled-line structure.
    pub fn has_ruled_lines(&self) -> bool {
        self.median_line_thickness().is_some()
    }
}

/// Clip a segment to a bounding box (Liang-Barsky).
///
/// Returns `None` when the segment lies entirely outside the box.
pub fn clip_segment(seg: &Segment, bbox: &BBox) -> Option<Segment> {
    let dx = seg.x1 - seg.x0;
    let dy = seg.y1 - seg.y0;
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    let checks = [
        (-dx, seg.x0 - bbox.x0),
        (dx, bbox.x1 - seg.x0),
        (-dy, seg.y0 - bbox.top),
        (dy, bbox.bottom - seg.y0),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return None;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }
    }

    Some(Segment::new(
        seg.x0 + t0 * dx,
        seg.y0 + t0 * dy,
        seg.x0 + t1 * dx,
        seg.y0 + t1 * dy,
        seg.width,
    ))
}
