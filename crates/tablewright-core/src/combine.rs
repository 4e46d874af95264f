//! Boundary combination: pooling, clustering, and voting.
//!
//! All activated hypotheses' points are pooled per axis and merged into a
//! single consensus hypothesis. Ruled-line points are physical ink marks
//! and are never outvoted.

use std::collections::BTreeMap;

use crate::boundary::{BoundaryHypothesis, BoundaryPoint};
use crate::context::TableContext;
use crate::geometry::median;
use crate::structure::RULED_LINES;

/// Structure-method tag carried by the combined hypothesis and by grids
/// extracted from it.
pub const CONSENSUS: &str = "consensus";

/// The adaptive scalar used both to expand narrow ranges and as the
/// clustering tolerance: median ruled-line thickness when present, else the
/// median inter-word gap when positive, else the median word height.
pub fn spatial_precision(ctx: &TableContext<'_>) -> f64 {
    if let Some(thickness) = ctx.median_line_thickness() {
        return thickness;
    }
    let gap = ctx.median_word_gap();
    if gap > 0.0 {
        return gap;
    }
    ctx.median_word_height()
}

/// Combine all hypotheses into one consensus hypothesis.
///
/// Point confidences are rescaled by `confidence_multipliers[provenance]`
/// (default 1.0) before voting. With zero hypotheses the consensus is empty
/// on both axes; with exactly one the boundaries pass through unchanged,
/// tagged [`CONSENSUS`], skipping the voting machinery entirely.
pub fn combine(
    ctx: &TableContext<'_>,
    hypotheses: &[BoundaryHypothesis],
    confidence_multipliers: &BTreeMap<String, f64>,
) -> BoundaryHypothesis {
    match hypotheses {
        [] => BoundaryHypothesis::new(CONSENSUS, Vec::new(), Vec::new()),
        [only] => BoundaryHypothesis::new(CONSENSUS, only.columns.clone(), only.rows.clone())
            .with_metadata("passthrough", only.method.clone()),
        _ => {
            let precision = spatial_precision(ctx);
            let scale = |points: Vec<BoundaryPoint>| -> Vec<BoundaryPoint> {
                points
                    .into_iter()
                    .map(|p| {
                        let multiplier = confidence_multipliers
                            .get(&p.provenance)
                            .copied()
                            .unwrap_or(1.0);
                        BoundaryPoint::new(
                            p.min_pos,
                            p.max_pos,
                            p.confidence * multiplier,
                            p.provenance,
                        )
                    })
                    .collect()
            };

            let columns = scale(
                hypotheses
                    .iter()
                    .flat_map(|h| h.columns.iter().cloned())
                    .collect(),
            );
            let rows = scale(
                hypotheses
                    .iter()
                    .flat_map(|h| h.rows.iter().cloned())
                    .collect(),
            );

            BoundaryHypothesis::new(
                CONSENSUS,
                combine_axis(columns, precision),
                combine_axis(rows, precision),
            )
        }
    }
}

/// One cluster of overlapping boundary points.
#[derive(Debug)]
struct Cluster {
    points: Vec<BoundaryPoint>,
}

impl Cluster {
    /// Confidence-weighted mean midpoint (unweighted fallback when the
    /// total confidence is 0).
    fn position(&self) -> f64 {
        let total: f64 = self.points.iter().map(|p| p.confidence).sum();
        if total > 0.0 {
            self.points
                .iter()
                .map(|p| p.midpoint() * p.confidence)
                .sum::<f64>()
                / total
        } else {
            self.points.iter().map(BoundaryPoint::midpoint).sum::<f64>() / self.points.len() as f64
        }
    }

    /// Count of distinct contributing provenances.
    fn distinct_methods(&self) -> usize {
        let mut names: Vec<&str> = self.points.iter().map(|p| p.provenance.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }

    fn mean_confidence(&self) -> f64 {
        self.points.iter().map(|p| p.confidence).sum::<f64>() / self.points.len() as f64
    }

    fn has_ruled_line(&self) -> bool {
        self.points.iter().any(|p| p.provenance == RULED_LINES)
    }
}

/// Expand, cluster, summarize, and vote on one axis's pooled points.
fn combine_axis(points: Vec<BoundaryPoint>, precision: f64) -> Vec<BoundaryPoint> {
    if points.is_empty() {
        return Vec::new();
    }

    // Expand: any point narrower than the spatial precision grows
    // symmetrically about its midpoint to exactly that width.
    let mut expanded: Vec<BoundaryPoint> = points
        .into_iter()
        .map(|p| {
            if p.width() < precision {
                let mid = p.midpoint();
                BoundaryPoint::new(
                    mid - precision / 2.0,
                    mid + precision / 2.0,
                    p.confidence,
                    p.provenance,
                )
            } else {
                p
            }
        })
        .collect();

    // Cluster: sort by lower bound and greedily merge points whose ranges
    // actually overlap (no added slack). Overlap is transitive through the
    // running cluster extent.
    expanded.sort_by(|a, b| a.min_pos.partial_cmp(&b.min_pos).unwrap());
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut cluster_max = f64::NEG_INFINITY;
    for point in expanded {
        if clusters.is_empty() || point.min_pos > cluster_max {
            cluster_max = point.max_pos;
            clusters.push(Cluster {
                points: vec![point],
            });
        } else {
            cluster_max = cluster_max.max(point.max_pos);
            clusters.last_mut().unwrap().points.push(point);
        }
    }

    // Accept: a lone cluster always passes. Otherwise a cluster needs at
    // least the median distinct-method count — unless it contains a
    // ruled-line point, which is never outvoted.
    if clusters.len() == 1 {
        let c = &clusters[0];
        return vec![BoundaryPoint::at(c.position(), c.mean_confidence(), CONSENSUS)];
    }

    let counts: Vec<f64> = clusters.iter().map(|c| c.distinct_methods() as f64).collect();
    let threshold = median(&counts).unwrap_or(0.0);

    clusters
        .iter()
        .filter(|c| c.distinct_methods() as f64 >= threshold || c.has_ruled_line())
        .map(|c| BoundaryPoint::at(c.position(), c.mean_confidence(), CONSENSUS))
        .collect()
}
