//! Post-processing: a fixed, ordered chain of grid-to-grid repairs.
//!
//! Each step is a total function from grid to grid: it either improves the
//! grid or returns it unchanged. The orchestrator's chain runner
//! additionally catches any internal fault and falls back to the
//! unmodified input, so a misbehaving step can never lose the table.

use regex::Regex;

use crate::context::TableContext;
use crate::grid::CellGrid;
use crate::input::FontSpan;

/// IQR multiplier for the footnote cell-length outlier threshold.
const FOOTNOTE_IQR_MULTIPLIER: f64 = 1.5;

/// Fraction of headers that must look fused for the header/data split to
/// trigger.
const HEADER_SPLIT_TRIGGER: f64 = 0.3;

/// Font size delta (points) above which a row's font differs materially
/// from the data font.
const HEADER_FONT_SIZE_DELTA: f64 = 0.5;

/// How many leading rows the caption strip inspects.
const CAPTION_ROW_WINDOW: usize = 5;

/// A grid repair step.
///
/// `apply` must be total: implementations return the input unchanged when
/// they find nothing to repair.
pub trait PostProcessor: Send + Sync {
    /// Stable step name.
    fn name(&self) -> &'static str;

    /// Produce a repaired grid (or a clone of the input).
    fn apply(&self, grid: &CellGrid, ctx: &TableContext<'_>) -> CellGrid;
}

/// The fixed standard chain, in application order.
pub fn standard_chain() -> Vec<Box<dyn PostProcessor>> {
    vec![
        Box::new(CaptionStrip),
        Box::new(HeaderDetection),
        Box::new(HeaderDataSplit),
        Box::new(ContinuationMerge),
        Box::new(InlineHeaderFill),
        Box::new(FootnoteStrip),
        Box::new(CellCleaning),
    ]
}

fn caption_pattern() -> Regex {
    Regex::new(r"(?i)^\s*(table|tab\.|exhibit|figure|fig\.)\s*([0-9]+|[ivxlcdm]+)?\s*[.:\-–]?\s*")
        .unwrap()
}

fn row_text(row: &[String]) -> String {
    row.iter()
        .filter(|c| !c.trim().is_empty())
        .map(|c| c.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

fn populated_indices(row: &[String]) -> Vec<usize> {
    row.iter()
        .enumerate()
        .filter(|(_, c)| !c.trim().is_empty())
        .map(|(i, _)| i)
        .collect()
}

// ─── 1. Absorbed-caption strip ─────────────────────────────────────────────

/// Removes a table caption that was absorbed into the grid.
///
/// Clears header cells matching the caption pattern and removes leading
/// rows (first few) whose populated text is a caption.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptionStrip;

impl PostProcessor for CaptionStrip {
    fn name(&self) -> &'static str {
        "caption_strip"
    }

    fn apply(&self, grid: &CellGrid, _ctx: &TableContext<'_>) -> CellGrid {
        let pattern = caption_pattern();
        let mut out = grid.clone();

        for header in &mut out.headers {
            if pattern.is_match(header) {
                header.clear();
            }
        }

        let mut removed = 0usize;
        out.rows.retain(|row| {
            if removed >= CAPTION_ROW_WINDOW {
                return true;
            }
            removed += 1;
            let populated = populated_indices(row);
            // A caption row carries one spilled text run, not tabular data.
            if populated.len() == 1 && pattern.is_match(&row_text(row)) {
                return false;
            }
            true
        });
        out
    }
}

// ─── 2. Font-metadata header detection ─────────────────────────────────────

/// Promotes leading rows to headers when their font differs materially from
/// the table's data font.
///
/// Runs only when no header is set. A leading block with a >0.5pt size
/// delta or a bold flip becomes the header; multi-row headers join per
/// column with a line break.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDetection;

#[derive(Debug, Clone, Copy, PartialEq)]
struct FontKey {
    /// Size in tenths of a point.
    size_decipoints: i64,
    bold: bool,
}

impl FontKey {
    fn of(span: &FontSpan) -> Self {
        Self {
            size_decipoints: (span.size * 10.0).round() as i64,
            bold: span.bold,
        }
    }

    fn size(&self) -> f64 {
        self.size_decipoints as f64 / 10.0
    }

    fn differs_materially(&self, other: &FontKey) -> bool {
        (self.size() - other.size()).abs() > HEADER_FONT_SIZE_DELTA || self.bold != other.bold
    }
}

/// Most frequent font among the given spans (ties resolve to the first
/// encountered).
fn modal_font<'s>(spans: impl Iterator<Item = &'s FontSpan>) -> Option<FontKey> {
    let mut counts: Vec<(FontKey, usize)> = Vec::new();
    for span in spans {
        let key = FontKey::of(span);
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key, 1)),
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, n)| *n)
        .map(|(k, _)| k)
}

/// Dominant font of the spans whose vertical center lies in `[top, bottom)`.
fn band_font(ctx: &TableContext<'_>, top: f64, bottom: f64) -> Option<FontKey> {
    modal_font(
        ctx.blocks()
            .iter()
            .flat_map(|b| b.spans.iter())
            .filter(|s| {
                let y = s.bbox.y_center();
                y >= top && y < bottom
            }),
    )
}

/// Vertical band for data row `index`, derived from the grid's row
/// boundaries and the table box.
fn row_band(grid: &CellGrid, ctx: &TableContext<'_>, index: usize) -> Option<(f64, f64)> {
    let bbox = ctx.bbox();
    let mut edges = Vec::with_capacity(grid.row_boundaries.len() + 2);
    edges.push(bbox.top);
    edges.extend(grid.row_boundaries.iter().copied());
    edges.push(bbox.bottom);
    let bands = edges.len() - 1;
    // Headers, when present, consumed the leading bands.
    let offset = bands.saturating_sub(grid.rows.len());
    let band = index + offset;
    if band + 1 >= edges.len() {
        return None;
    }
    Some((edges[band], edges[band + 1]))
}

impl PostProcessor for HeaderDetection {
    fn name(&self) -> &'static str {
        "header_detect"
    }

    fn apply(&self, grid: &CellGrid, ctx: &TableContext<'_>) -> CellGrid {
        let has_headers = grid.headers.iter().any(|h| !h.trim().is_empty());
        if has_headers || grid.rows.len() < 2 {
            return grid.clone();
        }

        let Some(data_font) = modal_font(ctx.blocks().iter().flat_map(|b| b.spans.iter())) else {
            return grid.clone();
        };

        // Leading block whose font differs materially from the data font.
        let mut header_rows = 0usize;
        for index in 0..grid.rows.len() - 1 {
            let Some((top, bottom)) = row_band(grid, ctx, index) else {
                break;
            };
            match band_font(ctx, top, bottom) {
                Some(font) if font.differs_materially(&data_font) => header_rows = index + 1,
                _ => break,
            }
        }
        if header_rows == 0 {
            return grid.clone();
        }

        let n_cols = grid.column_count();
        let mut headers = vec![String::new(); n_cols];
        for row in &grid.rows[..header_rows] {
            for (col, cell) in row.iter().enumerate() {
                if cell.trim().is_empty() {
                    continue;
                }
                if !headers[col].is_empty() {
                    headers[col].push('\n');
                }
                headers[col].push_str(cell.trim());
            }
        }

        let mut out = grid.clone();
        out.headers = headers;
        out.rows.drain(..header_rows);
        out
    }
}

// ─── 3. Header/data split ──────────────────────────────────────────────────

/// Splits a first data row that was absorbed into the headers.
///
/// Triggers when at least 30% of the populated headers end in a fused
/// numeric token; the numeric suffixes become a new leading data row.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDataSplit;

impl PostProcessor for HeaderDataSplit {
    fn name(&self) -> &'static str {
        "header_split"
    }

    fn apply(&self, grid: &CellGrid, _ctx: &TableContext<'_>) -> CellGrid {
        let fused_pattern = Regex::new(r"^(.*[^\d\s.,(-])\s+([-+(]?\d[\d,.]*%?\)?)$").unwrap();

        let populated: Vec<&String> =
            grid.headers.iter().filter(|h| !h.trim().is_empty()).collect();
        if populated.is_empty() {
            return grid.clone();
        }
        let fused = populated
            .iter()
            .filter(|h| fused_pattern.is_match(h.trim()))
            .count();
        if (fused as f64) < HEADER_SPLIT_TRIGGER * populated.len() as f64 || fused == 0 {
            return grid.clone();
        }

        let mut out = grid.clone();
        let mut recovered_row = vec![String::new(); grid.headers.len()];
        for (col, header) in out.headers.iter_mut().enumerate() {
            if let Some(caps) = fused_pattern.captures(header.trim()) {
                recovered_row[col] = caps[2].to_string();
                *header = caps[1].trim().to_string();
            }
        }
        out.rows.insert(0, recovered_row);
        out
    }
}

// ─── 4. Continuation merge ─────────────────────────────────────────────────

/// Merges wrapped continuation rows into their anchor row.
///
/// A row merges upward when its populated columns form a strict,
/// contiguous subset of the anchor row's populated columns; text is
/// concatenated with a space.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuationMerge;

fn is_contiguous(indices: &[usize]) -> bool {
    indices
        .windows(2)
        .all(|pair| pair[1] == pair[0] + 1)
}

fn is_strict_subset(sub: &[usize], of: &[usize]) -> bool {
    sub.len() < of.len() && sub.iter().all(|i| of.contains(i))
}

impl PostProcessor for ContinuationMerge {
    fn name(&self) -> &'static str {
        "continuation_merge"
    }

    fn apply(&self, grid: &CellGrid, _ctx: &TableContext<'_>) -> CellGrid {
        let mut out = grid.clone();
        let mut merged: Vec<Vec<String>> = Vec::new();

        for row in out.rows.drain(..) {
            let populated = populated_indices(&row);
            match merged.last_mut() {
                Some(anchor)
                    if !populated.is_empty()
                        && is_contiguous(&populated)
                        && is_strict_subset(&populated, &populated_indices(anchor)) =>
                {
                    for col in populated {
                        let text = row[col].trim();
                        if !anchor[col].is_empty() {
                            anchor[col].push(' ');
                        }
                        anchor[col].push_str(text);
                    }
                }
                _ => merged.push(row),
            }
        }
        out.rows = merged;
        out
    }
}

// ─── 5. Inline-header fill ─────────────────────────────────────────────────

/// Recovers sub-group headers written inline as full-width rows.
///
/// Detects a column populated exclusively when every other column is
/// empty, forward-fills its last value into subsequent data rows, and
/// removes the now-redundant header-only rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineHeaderFill;

impl PostProcessor for InlineHeaderFill {
    fn name(&self) -> &'static str {
        "inline_header_fill"
    }

    fn apply(&self, grid: &CellGrid, _ctx: &TableContext<'_>) -> CellGrid {
        let n_cols = grid.column_count();

        // A qualifying column is populated only in rows where every other
        // column is empty, and at least one such row exists.
        let mut group_col: Option<usize> = None;
        for col in 0..n_cols {
            let mut header_only_rows = 0usize;
            let mut exclusive = true;
            for row in &grid.rows {
                let cell_populated = row.get(col).is_some_and(|c| !c.trim().is_empty());
                if !cell_populated {
                    continue;
                }
                let others_empty = row
                    .iter()
                    .enumerate()
                    .all(|(i, c)| i == col || c.trim().is_empty());
                if others_empty {
                    header_only_rows += 1;
                } else {
                    exclusive = false;
                    break;
                }
            }
            if exclusive && header_only_rows > 0 && header_only_rows < grid.rows.len() {
                group_col = Some(col);
                break;
            }
        }
        let Some(col) = group_col else {
            return grid.clone();
        };

        let mut out = grid.clone();
        let mut current: Option<String> = None;
        let mut rows = Vec::with_capacity(out.rows.len());
        for mut row in out.rows.drain(..) {
            let cell_populated = row.get(col).is_some_and(|c| !c.trim().is_empty());
            if cell_populated {
                current = Some(row[col].trim().to_string());
                continue; // header-only row, removed
            }
            if let (Some(value), Some(cell)) = (&current, row.get_mut(col)) {
                *cell = value.clone();
            }
            rows.push(row);
        }
        out.rows = rows;
        out
    }
}

// ─── 6. Footnote strip ─────────────────────────────────────────────────────

/// Strips trailing footnote rows.
///
/// Scanning bottom-up, a row qualifies when at least 2 of 3 signals hold:
/// a recognized lead-in phrase, exactly one populated cell, or a cell
/// length beyond the IQR-derived outlier threshold of the table's own
/// cell-length distribution. The scan stops at the first non-qualifying
/// row; stripped text lands in [`CellGrid::footnotes`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FootnoteStrip;

fn footnote_lead_in() -> Regex {
    Regex::new(r"(?i)^\s*(notes?\b|sources?\b|\*|†|‡|§|¶|\d+\)\s|[a-z]\)\s)").unwrap()
}

/// Upper outlier threshold for cell lengths: Q3 + 1.5 × IQR.
///
/// Needs at least 4 populated cells to be meaningful.
fn length_outlier_threshold(grid: &CellGrid) -> Option<f64> {
    let mut lengths: Vec<f64> = grid
        .cells()
        .filter(|c| !c.trim().is_empty())
        .map(|c| c.chars().count() as f64)
        .collect();
    if lengths.len() < 4 {
        return None;
    }
    lengths.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let q1 = lengths[lengths.len() / 4];
    let q3 = lengths[(lengths.len() * 3) / 4];
    Some(q3 + FOOTNOTE_IQR_MULTIPLIER * (q3 - q1))
}

impl PostProcessor for FootnoteStrip {
    fn name(&self) -> &'static str {
        "footnote_strip"
    }

    fn apply(&self, grid: &CellGrid, _ctx: &TableContext<'_>) -> CellGrid {
        let lead_in = footnote_lead_in();
        let threshold = length_outlier_threshold(grid);
        let mut out = grid.clone();

        while let Some(last) = out.rows.last() {
            let populated = populated_indices(last);
            if populated.is_empty() {
                out.rows.pop();
                continue;
            }
            let text = row_text(last);

            let mut signals = 0;
            if lead_in.is_match(&text) {
                signals += 1;
            }
            if populated.len() == 1 {
                signals += 1;
            }
            if let Some(threshold) = threshold {
                let longest = last
                    .iter()
                    .map(|c| c.trim().chars().count() as f64)
                    .fold(0.0, f64::max);
                if longest > threshold {
                    signals += 1;
                }
            }

            if signals >= 2 {
                out.rows.pop();
                out.footnotes.push(text);
            } else {
                break;
            }
        }
        out
    }
}

// ─── 7. Cell cleaning ──────────────────────────────────────────────────────

/// Normalizes extraction artifacts cell by cell.
///
/// Expands ligature glyphs, strips control characters (preserved when the
/// table carries symbol/math fonts, whose control-range glyphs are real
/// content), reassembles split negative signs, recovers leading zeros in
/// numeric-looking cells, and collapses runs of whitespace. Idempotent.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellCleaning;

/// Latin ligatures U+FB00–U+FB06 and their expansions.
const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "ft"),
    ('\u{FB06}', "st"),
];

fn is_symbol_font(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ["symbol", "math", "cmsy", "cmmi", "cmex", "msam", "msbm"]
        .iter()
        .any(|tag| lower.contains(tag))
}

/// Compiled cleaning patterns. Compiled once per chain invocation.
struct Cleaner {
    horizontal_ws: Regex,
    split_negative: Regex,
    bare_decimal: Regex,
}

impl Cleaner {
    fn new() -> Self {
        Self {
            horizontal_ws: Regex::new(r"[^\S\n]+").unwrap(),
            split_negative: Regex::new(r"^-\s+(\d)").unwrap(),
            bare_decimal: Regex::new(r"^([-+]?)\.(\d[\d,]*%?)$").unwrap(),
        }
    }

    fn clean(&self, text: &str, preserve_controls: bool) -> String {
        let mut cleaned = String::with_capacity(text.len());
        for c in text.chars() {
            if let Some((_, expansion)) = LIGATURES.iter().find(|(lig, _)| *lig == c) {
                cleaned.push_str(expansion);
            } else if c == '\u{2212}' {
                cleaned.push('-'); // Unicode minus
            } else if c.is_control() && c != '\n' && !preserve_controls {
                // dropped
            } else {
                cleaned.push(c);
            }
        }

        // Collapse horizontal whitespace runs; line breaks are meaningful
        // in multi-row headers.
        let cleaned = self.horizontal_ws.replace_all(&cleaned, " ");
        let mut cleaned = cleaned.trim().to_string();

        // "- 1.23" → "-1.23"
        cleaned = self.split_negative.replace(&cleaned, "-$1").into_owned();

        // ".52" → "0.52" for numeric-looking cells
        cleaned = self.bare_decimal.replace(&cleaned, "${1}0.$2").into_owned();

        cleaned
    }
}

/// Clean one cell.
pub fn clean_cell(text: &str, preserve_controls: bool) -> String {
    Cleaner::new().clean(text, preserve_controls)
}

impl PostProcessor for CellCleaning {
    fn name(&self) -> &'static str {
        "cell_clean"
    }

    fn apply(&self, grid: &CellGrid, ctx: &TableContext<'_>) -> CellGrid {
        let preserve_controls = ctx
            .blocks()
            .iter()
            .flat_map(|b| b.spans.iter())
            .any(|s| is_symbol_font(&s.font_name));

        let cleaner = Cleaner::new();
        let mut out = grid.clone();
        for header in &mut out.headers {
            *header = cleaner.clean(header, preserve_controls);
        }
        for row in &mut out.rows {
            for cell in row {
                *cell = cleaner.clean(cell, preserve_controls);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;
    use crate::input::{PageContent, TextBlock};

    fn grid(headers: &[&str], rows: &[&[&str]]) -> CellGrid {
        CellGrid {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            ..CellGrid::default()
        }
    }

    fn empty_ctx_page() -> PageContent {
        PageContent::default()
    }

    fn apply<P: PostProcessor>(step: P, grid: &CellGrid) -> CellGrid {
        let page = empty_ctx_page();
        let ctx = TableContext::new(&page, BBox::new(0.0, 0.0, 200.0, 100.0));
        step.apply(grid, &ctx)
    }

    #[test]
    fn test_caption_strip_removes_leading_caption_row() {
        let g = grid(
            &[],
            &[
                &["Table 3: Revenue by region", "", ""],
                &["North", "12", "14"],
            ],
        );
        let out = apply(CaptionStrip, &g);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0][0], "North");
    }

    #[test]
    fn test_caption_strip_clears_caption_headers() {
        let g = grid(&["Table 1. Results", "Value"], &[&["a", "1"]]);
        let out = apply(CaptionStrip, &g);
        assert_eq!(out.headers, vec!["".to_string(), "Value".to_string()]);
    }

    #[test]
    fn test_caption_strip_leaves_data_rows() {
        let g = grid(&[], &[&["North", "12"], &["Table Mountain", "9"]]);
        let out = apply(CaptionStrip, &g);
        // Second row matches the pattern lexically but is a populated data
        // row, not a single spilled run.
        assert_eq!(out.rows.len(), 2);
    }

    #[test]
    fn test_header_split_recovers_fused_first_row() {
        let g = grid(
            &["Region 12", "Sales 340", "Share 0.5"],
            &[&["North", "11", "0.4"]],
        );
        let out = apply(HeaderDataSplit, &g);
        assert_eq!(
            out.headers,
            vec!["Region".to_string(), "Sales".to_string(), "Share".to_string()]
        );
        assert_eq!(out.rows[0], vec!["12", "340", "0.5"]);
        assert_eq!(out.rows.len(), 2);
    }

    #[test]
    fn test_header_split_needs_trigger_fraction() {
        let g = grid(
            &["Region 12", "Sales", "Share", "Total"],
            &[&["North", "11", "0.4", "12"]],
        );
        // 1 of 4 headers fused — below the 30% trigger.
        let out = apply(HeaderDataSplit, &g);
        assert_eq!(out, g);
    }

    #[test]
    fn test_continuation_merge() {
        let g = grid(
            &["Name", "Score", "Notes"],
            &[
                &["Alpha project", "12", "first"],
                &["(continued)", "", ""],
                &["Beta", "9", "second"],
            ],
        );
        let out = apply(ContinuationMerge, &g);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0][0], "Alpha project (continued)");
    }

    #[test]
    fn test_continuation_merge_requires_strict_subset() {
        let g = grid(
            &["a", "b"],
            &[&["x", "1"], &["y", "2"]],
        );
        // Full-width rows never merge.
        let out = apply(ContinuationMerge, &g);
        assert_eq!(out.rows.len(), 2);
    }

    #[test]
    fn test_inline_header_fill() {
        let g = grid(
            &["Group", "Item", "Value"],
            &[
                &["Fruits", "", ""],
                &["", "apple", "3"],
                &["", "pear", "5"],
                &["Nuts", "", ""],
                &["", "almond", "7"],
            ],
        );
        let out = apply(InlineHeaderFill, &g);
        assert_eq!(out.rows.len(), 3);
        assert_eq!(out.rows[0], vec!["Fruits", "apple", "3"]);
        assert_eq!(out.rows[1], vec!["Fruits", "pear", "5"]);
        assert_eq!(out.rows[2], vec!["Nuts", "almond", "7"]);
    }

    #[test]
    fn test_footnote_strip_reference_case() {
        let note = "Note. Sample size varies due to missing data for some respondents.";
        let g = grid(
            &["a", "b"],
            &[
                &["x", "1"],
                &["y", "2"],
                &["z", "3"],
                &["w", "4"],
                &[note, ""],
            ],
        );
        let out = apply(FootnoteStrip, &g);
        assert_eq!(out.rows.len(), 4);
        assert_eq!(out.footnotes, vec![note.to_string()]);
    }

    #[test]
    fn test_footnote_strip_stops_at_data_row() {
        let g = grid(
            &["a", "b"],
            &[&["x", "1"], &["y", "2"]],
        );
        let out = apply(FootnoteStrip, &g);
        assert_eq!(out.rows.len(), 2);
        assert!(out.footnotes.is_empty());
    }

    #[test]
    fn test_clean_cell_repairs() {
        assert_eq!(clean_cell("e\u{FB03}ciency", false), "efficiency");
        assert_eq!(clean_cell("- 1.23", false), "-1.23");
        assert_eq!(clean_cell(".52", false), "0.52");
        assert_eq!(clean_cell("-.52", false), "-0.52");
        assert_eq!(clean_cell("a\u{0007}b", false), "ab");
        assert_eq!(clean_cell("a\u{0007}b", true), "a\u{0007}b");
        assert_eq!(clean_cell("  spaced   out  ", false), "spaced out");
        assert_eq!(clean_cell("\u{2212}4", false), "-4");
    }

    #[test]
    fn test_cell_cleaning_idempotent() {
        let g = grid(
            &["e\u{FB03}ciency", "- 1.23"],
            &[&[".52", "  a   b  "], &["\u{2212}7", "plain"]],
        );
        let page = empty_ctx_page();
        let ctx = TableContext::new(&page, BBox::new(0.0, 0.0, 200.0, 100.0));
        let once = CellCleaning.apply(&g, &ctx);
        let twice = CellCleaning.apply(&once, &ctx);
        assert_eq!(once, twice);
        assert_eq!(once.headers[0], "efficiency");
        assert_eq!(once.rows[0][0], "0.52");
    }

    #[test]
    fn test_header_detection_promotes_bold_leading_row() {
        use crate::input::FontSpan;

        let mut g = grid(
            &[],
            &[&["Name", "Score"], &["alpha", "1"], &["beta", "2"]],
        );
        g.row_boundaries = vec![30.0, 60.0];

        let bold_span = FontSpan {
            text: "Name Score".into(),
            bbox: BBox::new(10.0, 10.0, 90.0, 20.0),
            font_name: "Helvetica-Bold".into(),
            size: 10.0,
            bold: true,
        };
        let data_span = |top: f64| FontSpan {
            text: "data".into(),
            bbox: BBox::new(10.0, top, 90.0, top + 10.0),
            font_name: "Helvetica".into(),
            size: 10.0,
            bold: false,
        };
        let page = PageContent {
            words: Vec::new(),
            segments: Vec::new(),
            blocks: vec![TextBlock {
                bbox: BBox::new(0.0, 0.0, 100.0, 100.0),
                spans: vec![bold_span, data_span(40.0), data_span(70.0)],
            }],
            width: 612.0,
            height: 792.0,
        };
        let ctx = TableContext::new(&page, BBox::new(0.0, 0.0, 100.0, 90.0));
        let out = HeaderDetection.apply(&g, &ctx);
        assert_eq!(out.headers, vec!["Name".to_string(), "Score".to_string()]);
        assert_eq!(out.rows.len(), 2);
    }

    #[test]
    fn test_header_detection_skips_when_headers_present() {
        let g = grid(&["already"], &[&["a"], &["b"]]);
        let out = apply(HeaderDetection, &g);
        assert_eq!(out, g);
    }
}
