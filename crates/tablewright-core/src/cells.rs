//! Cell extraction methods.
//!
//! Every method receives the same resolved boundary positions, making the
//! resulting grids directly comparable during scoring. Any method may
//! return `None` (no words, no content) without aborting the table.

use crate::context::TableContext;
use crate::geometry::BBox;
use crate::grid::CellGrid;
use crate::input::Word;

/// Method name for overlap-area assignment.
pub const OVERLAP: &str = "overlap";
/// Method name for word-center assignment.
pub const WORD_ASSIGN: &str = "word_assign";
/// Method name for per-cell crop extraction.
pub const CROP: &str = "crop";

/// Minimum fraction of a fragment's area that must fall inside the winning
/// cell for overlap assignment.
const OVERLAP_DECISION: f64 = 0.5;

/// A cell-text extraction strategy.
pub trait CellMethod: Send + Sync {
    /// Stable method name.
    fn name(&self) -> &'static str;

    /// Build a grid from the resolved boundary positions, or `None` when
    /// there is nothing to extract.
    fn extract(
        &self,
        ctx: &TableContext<'_>,
        col_positions: &[f64],
        row_positions: &[f64],
    ) -> Option<CellGrid>;
}

/// Cell index for a coordinate against sorted internal boundaries.
///
/// A value exactly equal to a boundary belongs to the following cell;
/// out-of-range indices clamp to the last valid cell.
fn cell_index(boundaries: &[f64], value: f64) -> usize {
    boundaries
        .partition_point(|&b| b <= value)
        .min(boundaries.len())
}

/// Words in reading order: visual rows top-to-bottom, left-to-right within
/// each row.
fn reading_order_words<'w>(ctx: &'w TableContext<'_>) -> impl Iterator<Item = &'w Word> {
    ctx.rows().iter().flatten()
}

/// Assemble a grid from per-cell word buckets.
///
/// The first row band becomes the header row when at least two bands
/// exist; a single-band grid is all data.
fn finish_grid(
    mut cells: Vec<Vec<String>>,
    col_positions: &[f64],
    row_positions: &[f64],
    method: &str,
    structure_method: &str,
) -> CellGrid {
    let (headers, rows) = if cells.len() >= 2 {
        let rest = cells.split_off(1);
        (cells.remove(0), rest)
    } else {
        (Vec::new(), cells)
    };
    CellGrid {
        headers,
        rows,
        col_boundaries: col_positions.to_vec(),
        row_boundaries: row_positions.to_vec(),
        method: method.to_string(),
        structure_method: structure_method.to_string(),
        footnotes: Vec::new(),
    }
}

fn push_word(cells: &mut [Vec<String>], row: usize, col: usize, text: &str) {
    let cell = &mut cells[row][col];
    if !cell.is_empty() {
        cell.push(' ');
    }
    cell.push_str(text);
}

/// Assigns each whole word to the cell its center point falls in.
///
/// Column/row indices come from a binary search against the sorted
/// internal boundary positions; words are concatenated left-to-right.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordAssignment;

impl WordAssignment {
    pub fn new() -> Self {
        Self
    }
}

impl CellMethod for WordAssignment {
    fn name(&self) -> &'static str {
        WORD_ASSIGN
    }

    fn extract(
        &self,
        ctx: &TableContext<'_>,
        col_positions: &[f64],
        row_positions: &[f64],
    ) -> Option<CellGrid> {
        if ctx.words().is_empty() {
            return None;
        }
        let n_cols = col_positions.len() + 1;
        let n_rows = row_positions.len() + 1;
        let mut cells = vec![vec![String::new(); n_cols]; n_rows];

        for word in reading_order_words(ctx) {
            let col = cell_index(col_positions, word.bbox.x_center()).min(n_cols - 1);
            let row = cell_index(row_positions, word.bbox.y_center()).min(n_rows - 1);
            push_word(&mut cells, row, col, &word.text);
        }

        Some(finish_grid(cells, col_positions, row_positions, WORD_ASSIGN, ""))
    }
}

/// Assigns each content fragment to the cell with the largest bbox overlap.
///
/// A fragment must have at least half its area inside the winning cell;
/// fragments failing the rule are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapAssignment;

impl CellMethod for OverlapAssignment {
    fn name(&self) -> &'static str {
        OVERLAP
    }

    fn extract(
        &self,
        ctx: &TableContext<'_>,
        col_positions: &[f64],
        row_positions: &[f64],
    ) -> Option<CellGrid> {
        if ctx.words().is_empty() {
            return None;
        }
        let col_edges = edges_with_box(col_positions, ctx.bbox().x0, ctx.bbox().x1);
        let row_edges = edges_with_box(row_positions, ctx.bbox().top, ctx.bbox().bottom);
        let n_cols = col_edges.len() - 1;
        let n_rows = row_edges.len() - 1;
        let mut cells = vec![vec![String::new(); n_cols]; n_rows];

        for word in reading_order_words(ctx) {
            let area = word.bbox.area();
            if area <= 0.0 {
                continue;
            }
            let mut best: Option<(usize, usize, f64)> = None;
            for r in 0..n_rows {
                for c in 0..n_cols {
                    let rect = BBox::new(col_edges[c], row_edges[r], col_edges[c + 1], row_edges[r + 1]);
                    let overlap = word.bbox.overlap_area(&rect);
                    if overlap > 0.0 && best.is_none_or(|(_, _, b)| overlap > b) {
                        best = Some((r, c, overlap));
                    }
                }
            }
            if let Some((r, c, overlap)) = best {
                if overlap >= OVERLAP_DECISION * area {
                    push_word(&mut cells, r, c, &word.text);
                }
            }
        }

        Some(finish_grid(cells, col_positions, row_positions, OVERLAP, ""))
    }
}

/// Independently crops the region to each cell rectangle and extracts that
/// rectangle's text with a generic any-overlap primitive.
///
/// Lower precision than the assignment methods (a straddling word lands in
/// every cell it touches) but fully independent — a cross-check path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CropExtract;

impl CellMethod for CropExtract {
    fn name(&self) -> &'static str {
        CROP
    }

    fn extract(
        &self,
        ctx: &TableContext<'_>,
        col_positions: &[f64],
        row_positions: &[f64],
    ) -> Option<CellGrid> {
        if ctx.words().is_empty() {
            return None;
        }
        let col_edges = edges_with_box(col_positions, ctx.bbox().x0, ctx.bbox().x1);
        let row_edges = edges_with_box(row_positions, ctx.bbox().top, ctx.bbox().bottom);
        let n_cols = col_edges.len() - 1;
        let n_rows = row_edges.len() - 1;

        let mut cells = vec![vec![String::new(); n_cols]; n_rows];
        for r in 0..n_rows {
            for c in 0..n_cols {
                let rect = BBox::new(col_edges[c], row_edges[r], col_edges[c + 1], row_edges[r + 1]);
                cells[r][c] = text_in_rect(ctx, &rect);
            }
        }

        Some(finish_grid(cells, col_positions, row_positions, CROP, ""))
    }
}

/// Generic text primitive: all words overlapping the rectangle, joined in
/// reading order.
pub fn text_in_rect(ctx: &TableContext<'_>, rect: &BBox) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for word in reading_order_words(ctx) {
        if word.bbox.overlap_area(rect) > 0.0 {
            parts.push(&word.text);
        }
    }
    parts.join(" ")
}

/// Internal boundaries plus the box edges, sorted and deduplicated.
fn edges_with_box(positions: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    let mut edges = vec![lo];
    edges.extend(positions.iter().copied().filter(|&p| p > lo && p < hi));
    edges.push(hi);
    edges.sort_by(|a, b| a.partial_cmp(b).unwrap());
    edges.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PageContent;

    fn word(text: &str, x0: f64, top: f64, x1: f64, bottom: f64) -> Word {
        Word::new(text, BBox::new(x0, top, x1, bottom))
    }

    fn page(words: Vec<Word>) -> PageContent {
        PageContent {
            words,
            segments: Vec::new(),
            blocks: Vec::new(),
            width: 612.0,
            height: 792.0,
        }
    }

    fn bbox() -> BBox {
        BBox::new(0.0, 0.0, 200.0, 100.0)
    }

    #[test]
    fn test_cell_index_boundary_equality_goes_right() {
        let boundaries = [10.0, 20.0];
        assert_eq!(cell_index(&boundaries, 5.0), 0);
        assert_eq!(cell_index(&boundaries, 10.0), 1); // exactly on boundary
        assert_eq!(cell_index(&boundaries, 15.0), 1);
        assert_eq!(cell_index(&boundaries, 20.0), 2);
        assert_eq!(cell_index(&boundaries, 99.0), 2);
    }

    #[test]
    fn test_word_assignment_no_boundaries_single_cell() {
        let p = page(vec![
            word("hello", 10.0, 10.0, 40.0, 20.0),
            word("world", 50.0, 10.0, 80.0, 20.0),
            word("below", 10.0, 40.0, 40.0, 50.0),
        ]);
        let ctx = TableContext::new(&p, bbox());
        let grid = WordAssignment::new().extract(&ctx, &[], &[]).unwrap();
        assert!(grid.headers.is_empty());
        assert_eq!(grid.rows, vec![vec!["hello world below".to_string()]]);
    }

    #[test]
    fn test_word_assignment_two_by_two() {
        let p = page(vec![
            word("h1", 10.0, 10.0, 40.0, 20.0),
            word("h2", 110.0, 10.0, 140.0, 20.0),
            word("a", 10.0, 40.0, 40.0, 50.0),
            word("b", 110.0, 40.0, 140.0, 50.0),
        ]);
        let ctx = TableContext::new(&p, bbox());
        let grid = WordAssignment::new()
            .extract(&ctx, &[100.0], &[30.0])
            .unwrap();
        assert_eq!(grid.headers, vec!["h1".to_string(), "h2".to_string()]);
        assert_eq!(
            grid.rows,
            vec![vec!["a".to_string(), "b".to_string()]]
        );
        assert_eq!(grid.col_boundaries, vec![100.0]);
        assert_eq!(grid.method, WORD_ASSIGN);
    }

    #[test]
    fn test_overlap_assignment_majority_side_wins() {
        // Word spans x 80..130 over a boundary at 100: 20 units left,
        // 30 right — 60% of its area is right of the boundary.
        let p = page(vec![
            word("top", 10.0, 10.0, 40.0, 20.0),
            word("straddler", 80.0, 40.0, 130.0, 50.0),
        ]);
        let ctx = TableContext::new(&p, bbox());
        let grid = OverlapAssignment.extract(&ctx, &[100.0], &[30.0]).unwrap();
        assert_eq!(grid.rows[0][0], "");
        assert_eq!(grid.rows[0][1], "straddler");
    }

    #[test]
    fn test_overlap_assignment_drops_sub_threshold_fragments() {
        // Word spans three cells; no cell holds ≥50% of it.
        let p = page(vec![
            word("top", 10.0, 10.0, 40.0, 20.0),
            word("sprawler", 40.0, 40.0, 160.0, 50.0),
        ]);
        let ctx = TableContext::new(&p, bbox());
        let grid = OverlapAssignment
            .extract(&ctx, &[80.0, 120.0], &[30.0])
            .unwrap();
        assert_eq!(grid.rows[0], vec!["", "", ""]);
    }

    #[test]
    fn test_crop_duplicates_straddling_words() {
        let p = page(vec![
            word("top", 10.0, 10.0, 40.0, 20.0),
            word("wide", 80.0, 40.0, 130.0, 50.0),
        ]);
        let ctx = TableContext::new(&p, bbox());
        let grid = CropExtract.extract(&ctx, &[100.0], &[30.0]).unwrap();
        assert_eq!(grid.rows[0][0], "wide");
        assert_eq!(grid.rows[0][1], "wide");
    }

    #[test]
    fn test_methods_return_none_without_words() {
        let p = page(Vec::new());
        let ctx = TableContext::new(&p, bbox());
        assert!(WordAssignment::new().extract(&ctx, &[], &[]).is_none());
        assert!(OverlapAssignment.extract(&ctx, &[], &[]).is_none());
        assert!(CropExtract.extract(&ctx, &[], &[]).is_none());
    }
}
