//! Extraction outcome: the winning grid plus full pipeline provenance.

use tablewright_core::boundary::BoundaryHypothesis;
use tablewright_core::error::{MethodError, MethodTiming};
use tablewright_core::grid::CellGrid;
use tablewright_core::scoring::GridScore;

/// Everything one pipeline run produced.
///
/// `table` is the scored, post-processed winner; the remaining fields keep
/// the intermediate products for diagnostics. Faults never surface as
/// panics or errors here — a method that failed appears in `errors` and
/// contributes nothing else.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExtractionResult {
    /// Final table.
    pub table: CellGrid,
    /// Raw hypotheses from every structure method that produced one.
    pub hypotheses: Vec<BoundaryHypothesis>,
    /// Consensus boundaries, when more than zero hypotheses existed.
    pub consensus: Option<BoundaryHypothesis>,
    /// Every candidate grid, in production order.
    pub candidates: Vec<CellGrid>,
    /// Scores aligned with `candidates`.
    pub scores: Vec<GridScore>,
    /// Index of the winner in `candidates`, if any candidate existed.
    pub winner: Option<usize>,
    /// Wall-clock timing per method invocation, success or failure.
    pub timings: Vec<MethodTiming>,
    /// Faults swallowed during the run.
    pub errors: Vec<MethodError>,
}

impl ExtractionResult {
    /// True when no structure method produced a usable table.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
