//! Grid quality scoring and winner selection.
//!
//! Selection is by rank aggregation, never absolute weights: each metric is
//! converted to an ordinal rank across all candidate grids (ties receive
//! the averaged rank of the tied positions), ranks are summed per grid, and
//! the lowest rank sum wins.

use regex::Regex;

use crate::grid::CellGrid;

/// Mean token length above which a cell counts as garbled.
const GARBLED_TOKEN_LENGTH: f64 = 25.0;

/// Fraction of populated cells that must parse as numeric for a column to
/// be judged for numeric coherence.
const NUMERIC_COLUMN_MAJORITY: f64 = 0.5;

/// Per-grid quality metrics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridMetrics {
    /// Fraction of non-blank cells (vacuously 1.0 with no cells). Higher
    /// is better.
    pub fill_rate: f64,
    /// Cells with a leading dot and no integer part. Lower is better.
    pub decimal_displacement_count: usize,
    /// Fraction of non-math/non-Greek cells whose mean token length
    /// exceeds the garbled threshold. Lower is better.
    pub garbled_text_score: f64,
    /// Among majority-numeric columns, the fraction that are purely
    /// numeric (vacuously 1.0 with no such column). Higher is better.
    pub numeric_coherence: f64,
}

/// A grid's metrics plus its aggregated rank sum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridScore {
    pub metrics: GridMetrics,
    /// Sum of the grid's per-metric ranks; lower is better.
    pub rank_sum: f64,
}

/// Does the cell look like a number (currency/percent/paren-negative forms
/// included)?
pub fn is_numeric_cell(re: &NumericPatterns, cell: &str) -> bool {
    re.numeric.is_match(cell)
}

/// Compiled patterns used by the metrics. Compiled once per scoring pass.
pub struct NumericPatterns {
    numeric: Regex,
    displaced_decimal: Regex,
}

impl NumericPatterns {
    pub fn new() -> Self {
        Self {
            numeric: Regex::new(r"^\s*\(?[-+]?[$€£¥]?\s*\d[\d,.]*\s*%?\)?\s*$").unwrap(),
            displaced_decimal: Regex::new(r"^\s*[-+]?\.\d").unwrap(),
        }
    }
}

impl Default for NumericPatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the text carries Greek letters or mathematical symbols; such
/// cells are exempt from the garbled-text metric.
fn is_math_or_greek(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{0370}'..='\u{03FF}'   // Greek and Coptic
            | '\u{2200}'..='\u{22FF}' // Mathematical operators
            | '\u{27C0}'..='\u{27EF}' // Misc mathematical symbols A
            | '\u{2980}'..='\u{29FF}' // Misc mathematical symbols B
        )
    })
}

/// Compute all quality metrics for a grid.
pub fn grid_metrics(grid: &CellGrid) -> GridMetrics {
    let patterns = NumericPatterns::new();
    grid_metrics_with(grid, &patterns)
}

/// Metric computation with caller-supplied compiled patterns.
pub fn grid_metrics_with(grid: &CellGrid, patterns: &NumericPatterns) -> GridMetrics {
    let fill_rate = grid.fill_rate();

    let decimal_displacement_count = grid
        .cells()
        .filter(|c| patterns.displaced_decimal.is_match(c))
        .count();

    // Garbled text: long unbroken runs in ordinary-text cells.
    let mut considered = 0usize;
    let mut garbled = 0usize;
    for cell in grid.cells() {
        let trimmed = cell.trim();
        if trimmed.is_empty() || is_math_or_greek(trimmed) {
            continue;
        }
        considered += 1;
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let mean_len =
            tokens.iter().map(|t| t.chars().count()).sum::<usize>() as f64 / tokens.len() as f64;
        if mean_len > GARBLED_TOKEN_LENGTH {
            garbled += 1;
        }
    }
    let garbled_text_score = if considered == 0 {
        0.0
    } else {
        garbled as f64 / considered as f64
    };

    // Numeric coherence over data-row columns.
    let n_cols = grid.rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut candidate_columns = 0usize;
    let mut coherent_columns = 0usize;
    for col in 0..n_cols {
        let populated: Vec<&str> = grid
            .rows
            .iter()
            .filter_map(|r| r.get(col))
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
            .collect();
        if populated.is_empty() {
            continue;
        }
        let numeric = populated
            .iter()
            .filter(|c| is_numeric_cell(patterns, c))
            .count();
        if numeric as f64 / populated.len() as f64 > NUMERIC_COLUMN_MAJORITY {
            candidate_columns += 1;
            if numeric == populated.len() {
                coherent_columns += 1;
            }
        }
    }
    let numeric_coherence = if candidate_columns == 0 {
        1.0
    } else {
        coherent_columns as f64 / candidate_columns as f64
    };

    GridMetrics {
        fill_rate,
        decimal_displacement_count,
        garbled_text_score,
        numeric_coherence,
    }
}

/// Ordinal ranks (1 = best) with ties receiving the averaged rank of the
/// tied positions.
fn tied_ranks(values: &[f64], higher_is_better: bool) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let cmp = values[a].partial_cmp(&values[b]).unwrap();
        if higher_is_better { cmp.reverse() } else { cmp }
    });

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j (0-based) share the averaged 1-based rank.
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Rank sums for a set of metric tuples; lower is better.
pub fn rank_sums(metrics: &[GridMetrics]) -> Vec<f64> {
    rank_sums_with_reference(metrics, None)
}

/// Rank sums with an optional injected ground-truth accuracy per grid
/// (higher is better) as a fifth ranking signal.
///
/// The reference signal is for offline evaluation only — production
/// selection never supplies it.
pub fn rank_sums_with_reference(
    metrics: &[GridMetrics],
    reference_accuracy: Option<&[f64]>,
) -> Vec<f64> {
    let fill: Vec<f64> = metrics.iter().map(|m| m.fill_rate).collect();
    let decimal: Vec<f64> = metrics
        .iter()
        .map(|m| m.decimal_displacement_count as f64)
        .collect();
    let garbled: Vec<f64> = metrics.iter().map(|m| m.garbled_text_score).collect();
    let coherence: Vec<f64> = metrics.iter().map(|m| m.numeric_coherence).collect();

    let mut sums = vec![0.0; metrics.len()];
    for (ranks, _) in [
        (tied_ranks(&fill, true), "fill"),
        (tied_ranks(&decimal, false), "decimal"),
        (tied_ranks(&garbled, false), "garbled"),
        (tied_ranks(&coherence, true), "coherence"),
    ] {
        for (sum, rank) in sums.iter_mut().zip(&ranks) {
            *sum += rank;
        }
    }
    if let Some(accuracy) = reference_accuracy {
        for (sum, rank) in sums.iter_mut().zip(&tied_ranks(accuracy, true)) {
            *sum += rank;
        }
    }
    sums
}

/// Score every grid and return the metrics + rank sum per grid, in input
/// order.
pub fn score_grids(grids: &[CellGrid]) -> Vec<GridScore> {
    let patterns = NumericPatterns::new();
    let metrics: Vec<GridMetrics> = grids
        .iter()
        .map(|g| grid_metrics_with(g, &patterns))
        .collect();
    let sums = rank_sums(&metrics);
    metrics
        .into_iter()
        .zip(sums)
        .map(|(metrics, rank_sum)| GridScore { metrics, rank_sum })
        .collect()
}

/// Index of the winning score (lowest rank sum; ties resolve to the
/// earliest-produced grid). `None` for an empty candidate set.
pub fn select_best(scores: &[GridScore]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.iter().enumerate() {
        if best.is_none_or(|(_, s)| score.rank_sum < s) {
            best = Some((i, score.rank_sum));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_decimal_displacement() {
        let g = grid(&["a"], &[&[".52"], &["0.52"], &["-.3"]]);
        let m = grid_metrics(&g);
        assert_eq!(m.decimal_displacement_count, 2);
    }

    #[test]
    fn test_garbled_exempts_math_and_greek() {
        let long_garbage = "x".repeat(40);
        let greek = format!("α{}", "y".repeat(40));
        let g = grid(&[], &[&[&long_garbage, &greek, "normal text"]]);
        let m = grid_metrics(&g);
        // 2 considered (greek exempt), 1 garbled
        assert!((m.garbled_text_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_coherence_flags_mixed_columns() {
        // col0: purely numeric; col1: majority numeric but mixed; col2: text.
        let g = grid(
            &["a", "b", "c"],
            &[
                &["1", "2", "x"],
                &["2", "3", "y"],
                &["3", "oops", "z"],
            ],
        );
        let m = grid_metrics(&g);
        assert!((m.numeric_coherence - 0.5).abs() < 1e-9);

        let no_numeric = grid(&["a"], &[&["x"], &["y"]]);
        assert_eq!(grid_metrics(&no_numeric).numeric_coherence, 1.0);
    }

    #[test]
    fn test_numeric_cell_forms() {
        let p = NumericPatterns::new();
        for cell in ["42", " 1,234.5 ", "-3.2", "(1.5)", "$12", "12%"] {
            assert!(is_numeric_cell(&p, cell), "{cell} should be numeric");
        }
        for cell in ["x42", "12 apples", ""] {
            assert!(!is_numeric_cell(&p, cell), "{cell} should not be numeric");
        }
    }

    #[test]
    fn test_rank_aggregation_reference_case() {
        // Grid A (fill .90, garbled 0, coherence 1) beats grid B
        // (fill .95, garbled .1, coherence .5); decimal ties get the
        // averaged rank.
        let a = GridMetrics {
            fill_rate: 0.90,
            decimal_displacement_count: 0,
            garbled_text_score: 0.0,
            numeric_coherence: 1.0,
        };
        let b = GridMetrics {
            fill_rate: 0.95,
            decimal_displacement_count: 0,
            garbled_text_score: 0.1,
            numeric_coherence: 0.5,
        };
        let sums = rank_sums(&[a, b]);
        assert_eq!(sums, vec![2.0 + 1.5 + 1.0 + 1.0, 1.0 + 1.5 + 2.0 + 2.0]);
        assert!(sums[0] < sums[1]);
    }

    #[test]
    fn test_reference_signal_can_flip_selection() {
        let a = GridMetrics {
            fill_rate: 0.90,
            decimal_displacement_count: 0,
            garbled_text_score: 0.0,
            numeric_coherence: 1.0,
        };
        let b = GridMetrics {
            fill_rate: 0.95,
            decimal_displacement_count: 0,
            garbled_text_score: 0.1,
            numeric_coherence: 0.5,
        };
        let plain = rank_sums(&[a.clone(), b.clone()]);
        assert!(plain[0] < plain[1]);
        let with_ref = rank_sums_with_reference(&[a, b], Some(&[0.2, 0.9]));
        // Accuracy strongly favors B but one signal only narrows the gap
        // here; it must still be counted.
        assert_eq!(with_ref[0], plain[0] + 2.0);
        assert_eq!(with_ref[1], plain[1] + 1.0);
    }

    #[test]
    fn test_select_best_tie_breaks_to_first() {
        let g1 = grid(&["a"], &[&["1"]]);
        let g2 = grid(&["a"], &[&["1"]]);
        assert_eq!(select_best(&score_grids(&[g1, g2])), Some(0));
        assert_eq!(select_best(&[]), None);
    }
}
