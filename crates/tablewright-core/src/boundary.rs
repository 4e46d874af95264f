//! Boundary candidate types shared by all structure detection methods.

use std::collections::BTreeMap;

/// A candidate divider position, expressed as a closed range.
///
/// Ranges (rather than bare scalars) let uncertain detections merge
/// naturally during combination. Invariant: `min_pos <= max_pos`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryPoint {
    /// Lower bound of the divider position.
    pub min_pos: f64,
    /// Upper bound of the divider position.
    pub max_pos: f64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Name of the method that produced this point.
    pub provenance: String,
}

impl BoundaryPoint {
    /// Create a point, normalizing a reversed range and clamping confidence
    /// to [0, 1].
    pub fn new(min_pos: f64, max_pos: f64, confidence: f64, provenance: impl Into<String>) -> Self {
        let (lo, hi) = if min_pos <= max_pos {
            (min_pos, max_pos)
        } else {
            (max_pos, min_pos)
        };
        Self {
            min_pos: lo,
            max_pos: hi,
            confidence: confidence.clamp(0.0, 1.0),
            provenance: provenance.into(),
        }
    }

    /// Create a degenerate point at a single position.
    pub fn at(pos: f64, confidence: f64, provenance: impl Into<String>) -> Self {
        Self::new(pos, pos, confidence, provenance)
    }

    /// Midpoint of the range.
    pub fn midpoint(&self) -> f64 {
        (self.min_pos + self.max_pos) / 2.0
    }

    /// Width of the range.
    pub fn width(&self) -> f64 {
        self.max_pos - self.min_pos
    }

    /// Whether this range overlaps another (touching ranges count).
    pub fn overlaps(&self, other: &BoundaryPoint) -> bool {
        self.min_pos <= other.max_pos && other.min_pos <= self.max_pos
    }
}

/// One structure method's proposed column/row dividers for a table region.
///
/// Produced by exactly one [`detect`](crate::structure::StructureMethod::detect)
/// call; immutable once returned.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryHypothesis {
    /// Candidate column dividers, ordered left-to-right.
    pub columns: Vec<BoundaryPoint>,
    /// Candidate row dividers, ordered top-to-bottom.
    pub rows: Vec<BoundaryPoint>,
    /// Name of the producing method.
    pub method: String,
    /// Free-form metadata recorded by the producing method.
    pub metadata: BTreeMap<String, String>,
}

impl BoundaryHypothesis {
    /// Create a hypothesis, sorting points along each axis.
    pub fn new(
        method: impl Into<String>,
        mut columns: Vec<BoundaryPoint>,
        mut rows: Vec<BoundaryPoint>,
    ) -> Self {
        let by_midpoint = |a: &BoundaryPoint, b: &BoundaryPoint| {
            a.midpoint().partial_cmp(&b.midpoint()).unwrap()
        };
        columns.sort_by(by_midpoint);
        rows.sort_by(by_midpoint);
        Self {
            columns,
            rows,
            method: method.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry, returning the modified hypothesis.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Resolved column positions (range midpoints), ordered.
    pub fn column_positions(&self) -> Vec<f64> {
        self.columns.iter().map(|p| p.midpoint()).collect()
    }

    /// Resolved row positions (range midpoints), ordered.
    pub fn row_positions(&self) -> Vec<f64> {
        self.rows.iter().map(|p| p.midpoint()).collect()
    }

    /// True when both axes are empty.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}
