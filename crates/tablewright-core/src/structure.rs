//! Structure detection methods.
//!
//! Each method independently proposes a [`BoundaryHypothesis`] (candidate
//! column/row dividers) from a [`TableContext`]. Methods are side-effect
//! free, share no mutable state, and may return `None` when they find no
//! signal. Faults are isolated by the orchestrator; a method is never
//! fatal to a table.

use crate::boundary::{BoundaryHypothesis, BoundaryPoint};
use crate::context::TableContext;
use crate::geometry::{Orientation, classify_orientation, median};

/// Method name for ruled-line detection. Boundary points carrying this
/// provenance are treated as high-trust signals by the combiner.
pub const RULED_LINES: &str = "ruled_lines";
/// Method name for the single-point hotspot variant.
pub const HOTSPOT_SINGLE: &str = "hotspot_single";
/// Method name for the gap-span hotspot variant.
pub const HOTSPOT_SPAN: &str = "hotspot_span";
/// Method name for the global cliff variant.
pub const CLIFF_GLOBAL: &str = "cliff_global";
/// Method name for the per-row cliff variant.
pub const CLIFF_PER_ROW: &str = "cliff_per_row";
/// Method name for the header-anchor method.
pub const HEADER_ANCHOR: &str = "header_anchor";

/// Minimum inter-word gap, as a fraction of the median word height, for a
/// gap to qualify as a column-boundary candidate.
const MIN_GAP_RATIO: f64 = 0.25;

/// A structure detection strategy.
///
/// Implementations are polymorphic values behind `dyn StructureMethod`;
/// the stable [`name`](StructureMethod::name) keys activation rules and
/// confidence multipliers.
pub trait StructureMethod: Send + Sync {
    /// Stable method name (provenance tag for produced points).
    fn name(&self) -> &'static str;

    /// Propose boundaries for the region, or `None` when there is no signal.
    fn detect(&self, ctx: &TableContext<'_>) -> Option<BoundaryHypothesis>;
}

// ─── Shared gap machinery ──────────────────────────────────────────────────

/// An inter-word horizontal gap within one visual row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Gap {
    /// Index of the row the gap was observed in.
    pub row: usize,
    /// Right edge of the word before the gap.
    pub start: f64,
    /// Left edge of the word after the gap.
    pub end: f64,
}

impl Gap {
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn size(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, pos: f64) -> bool {
        pos >= self.start && pos <= self.end
    }
}

/// Collect qualifying inter-word gaps across all rows.
///
/// A gap qualifies when it is at least `MIN_GAP_RATIO` of the median word
/// height wide.
pub(crate) fn qualifying_gaps(ctx: &TableContext<'_>) -> Vec<Gap> {
    let min_gap = MIN_GAP_RATIO * ctx.median_word_height();
    let mut gaps = Vec::new();
    for (row_idx, row) in ctx.rows().iter().enumerate() {
        for pair in row.windows(2) {
            let start = pair[0].bbox.x1;
            let end = pair[1].bbox.x0;
            if end - start >= min_gap && end > start {
                gaps.push(Gap {
                    row: row_idx,
                    start,
                    end,
                });
            }
        }
    }
    gaps
}

/// Clustering tolerance for gap midpoints: the median word width, falling
/// back to the median word height for degenerate content.
fn gap_cluster_tolerance(ctx: &TableContext<'_>) -> f64 {
    let w = ctx.median_word_width();
    if w > 0.0 {
        w
    } else {
        ctx.median_word_height().max(1.0)
    }
}

/// A cluster of gaps agreeing on a column position.
#[derive(Debug, Clone)]
struct GapCluster {
    members: Vec<Gap>,
}

impl GapCluster {
    fn min_midpoint(&self) -> f64 {
        self.members
            .iter()
            .map(Gap::midpoint)
            .fold(f64::INFINITY, f64::min)
    }

    fn max_midpoint(&self) -> f64 {
        self.members
            .iter()
            .map(Gap::midpoint)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn mean_midpoint(&self) -> f64 {
        self.members.iter().map(Gap::midpoint).sum::<f64>() / self.members.len() as f64
    }

    /// Distinct rows contributing a gap midpoint to this cluster.
    fn support(&self) -> usize {
        let mut rows: Vec<usize> = self.members.iter().map(|g| g.row).collect();
        rows.sort_unstable();
        rows.dedup();
        rows.len()
    }
}

/// Cluster gaps by midpoint: sort, then group consecutive gaps within
/// `tolerance` of the cluster's first midpoint.
fn cluster_gaps(mut gaps: Vec<Gap>, tolerance: f64) -> Vec<GapCluster> {
    if gaps.is_empty() {
        return Vec::new();
    }
    gaps.sort_by(|a, b| a.midpoint().partial_cmp(&b.midpoint()).unwrap());

    let mut clusters: Vec<GapCluster> = Vec::new();
    let mut start_mid = f64::NEG_INFINITY;
    for gap in gaps {
        if clusters.is_empty() || (gap.midpoint() - start_mid).abs() > tolerance {
            start_mid = gap.midpoint();
            clusters.push(GapCluster { members: vec![gap] });
        } else {
            clusters.last_mut().unwrap().members.push(gap);
        }
    }
    clusters
}

/// Row dividers from the midlines between vertically adjacent word rows.
///
/// Confidence scales with the vertical separation relative to the median
/// word height; touching rows get a low-confidence degenerate point.
pub(crate) fn row_boundary_points(
    ctx: &TableContext<'_>,
    provenance: &str,
) -> Vec<BoundaryPoint> {
    let rows = ctx.rows();
    let word_height = ctx.median_word_height();
    let mut points = Vec::new();
    for pair in rows.windows(2) {
        let above = pair[0]
            .iter()
            .map(|w| w.bbox.bottom)
            .fold(f64::NEG_INFINITY, f64::max);
        let below = pair[1]
            .iter()
            .map(|w| w.bbox.top)
            .fold(f64::INFINITY, f64::min);
        if below > above {
            let confidence = if word_height > 0.0 {
                ((below - above) / word_height).clamp(0.0, 1.0)
            } else {
                0.5
            };
            points.push(BoundaryPoint::new(above, below, confidence, provenance));
        } else {
            points.push(BoundaryPoint::at((above + below) / 2.0, 0.3, provenance));
        }
    }
    points
}

// ─── Ruled-line detection ──────────────────────────────────────────────────

/// Detects boundaries from ruled lines (physical ink marks).
///
/// Segments within ±5° of an axis are classified horizontal/vertical;
/// diagonals are discarded. Each surviving segment, already clipped to the
/// box by the context, becomes a candidate at confidence clipped-length ÷
/// box-dimension. Candidates are clustered within half the median word
/// height, merging to the confidence-weighted mean position and taking the
/// cluster's maximum confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuledLineDetection;

/// One ruled-line candidate before clustering.
#[derive(Debug, Clone, Copy)]
struct LineCandidate {
    lo: f64,
    hi: f64,
    confidence: f64,
}

impl LineCandidate {
    fn midpoint(&self) -> f64 {
        (self.lo + self.hi) / 2.0
    }
}

impl StructureMethod for RuledLineDetection {
    fn name(&self) -> &'static str {
        RULED_LINES
    }

    fn detect(&self, ctx: &TableContext<'_>) -> Option<BoundaryHypothesis> {
        let segments = ctx.segments();
        if segments.is_empty() {
            return None;
        }
        let bbox = ctx.bbox();

        let mut verticals: Vec<LineCandidate> = Vec::new();
        let mut horizontals: Vec<LineCandidate> = Vec::new();
        for seg in segments {
            match classify_orientation(seg.x0, seg.y0, seg.x1, seg.y1) {
                Orientation::Vertical => {
                    let confidence = if bbox.height() > 0.0 {
                        ((seg.y1 - seg.y0).abs() / bbox.height()).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    verticals.push(LineCandidate {
                        lo: seg.x0.min(seg.x1),
                        hi: seg.x0.max(seg.x1),
                        confidence,
                    });
                }
                Orientation::Horizontal => {
                    let confidence = if bbox.width() > 0.0 {
                        ((seg.x1 - seg.x0).abs() / bbox.width()).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    horizontals.push(LineCandidate {
                        lo: seg.y0.min(seg.y1),
                        hi: seg.y0.max(seg.y1),
                        confidence,
                    });
                }
                Orientation::Diagonal => {}
            }
        }

        let tolerance = if ctx.median_word_height() > 0.0 {
            ctx.median_word_height() / 2.0
        } else {
            ctx.median_line_thickness().unwrap_or(1.0)
        };

        // Frame lines duplicate the box edges and would create sliver cells.
        let columns = cluster_line_candidates(verticals, tolerance)
            .into_iter()
            .filter(|p| {
                p.midpoint() - bbox.x0 > tolerance && bbox.x1 - p.midpoint() > tolerance
            })
            .collect::<Vec<_>>();
        let rows = cluster_line_candidates(horizontals, tolerance)
            .into_iter()
            .filter(|p| {
                p.midpoint() - bbox.top > tolerance && bbox.bottom - p.midpoint() > tolerance
            })
            .collect::<Vec<_>>();

        if columns.is_empty() && rows.is_empty() {
            return None;
        }
        Some(BoundaryHypothesis::new(RULED_LINES, columns, rows))
    }
}

/// Cluster line candidates along the perpendicular axis; merge each cluster
/// to the confidence-weighted mean position at the cluster's max confidence.
fn cluster_line_candidates(
    mut candidates: Vec<LineCandidate>,
    tolerance: f64,
) -> Vec<BoundaryPoint> {
    if candidates.is_empty() {
        return Vec::new();
    }
    candidates.sort_by(|a, b| a.midpoint().partial_cmp(&b.midpoint()).unwrap());

    let mut points = Vec::new();
    let mut cluster: Vec<LineCandidate> = Vec::new();
    let mut start_mid = f64::NEG_INFINITY;
    for cand in candidates {
        if cluster.is_empty() || (cand.midpoint() - start_mid).abs() <= tolerance {
            if cluster.is_empty() {
                start_mid = cand.midpoint();
            }
            cluster.push(cand);
        } else {
            points.push(summarize_line_cluster(&cluster));
            start_mid = cand.midpoint();
            cluster = vec![cand];
        }
    }
    points.push(summarize_line_cluster(&cluster));
    points
}

fn summarize_line_cluster(cluster: &[LineCandidate]) -> BoundaryPoint {
    let total: f64 = cluster.iter().map(|c| c.confidence).sum();
    let mean = if total > 0.0 {
        cluster
            .iter()
            .map(|c| c.midpoint() * c.confidence)
            .sum::<f64>()
            / total
    } else {
        cluster.iter().map(LineCandidate::midpoint).sum::<f64>() / cluster.len() as f64
    };
    let max_confidence = cluster.iter().map(|c| c.confidence).fold(0.0, f64::max);
    let half_width = cluster
        .iter()
        .map(|c| c.hi - c.lo)
        .fold(0.0, f64::max)
        .max(0.0)
        / 2.0;
    BoundaryPoint::new(mean - half_width, mean + half_width, max_confidence, RULED_LINES)
}

// ─── Hotspot ───────────────────────────────────────────────────────────────

/// How a hotspot cluster credits rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotspotMode {
    /// A row supports a cluster only through its gap midpoint.
    SinglePoint,
    /// A row also supports a cluster when its entire gap interval contains
    /// the cluster position; raises recall for staggered tables.
    GapSpan,
}

/// Detects column boundaries from recurring inter-word gap positions.
///
/// Gap midpoints are clustered by the median word width; clusters pass a
/// two-tier acceptance (support ≥ 2, then support ≥ 0.3 × median survivor
/// support). Confidence is support ÷ row count.
#[derive(Debug, Clone, Copy)]
pub struct Hotspot {
    mode: HotspotMode,
}

impl Hotspot {
    pub fn new(mode: HotspotMode) -> Self {
        Self { mode }
    }

    pub fn single_point() -> Self {
        Self::new(HotspotMode::SinglePoint)
    }

    pub fn gap_span() -> Self {
        Self::new(HotspotMode::GapSpan)
    }
}

/// Drop survivors whose support falls below this fraction of the median
/// survivor support.
const HOTSPOT_SUPPORT_RATIO: f64 = 0.3;

impl StructureMethod for Hotspot {
    fn name(&self) -> &'static str {
        match self.mode {
            HotspotMode::SinglePoint => HOTSPOT_SINGLE,
            HotspotMode::GapSpan => HOTSPOT_SPAN,
        }
    }

    fn detect(&self, ctx: &TableContext<'_>) -> Option<BoundaryHypothesis> {
        let row_count = ctx.rows().len();
        if row_count == 0 {
            return None;
        }
        let gaps = qualifying_gaps(ctx);
        let all_gaps = gaps.clone();
        let clusters = cluster_gaps(gaps, gap_cluster_tolerance(ctx));

        // Support per cluster; the GapSpan variant additionally credits any
        // row whose whole gap interval contains the cluster position.
        let supported: Vec<(GapCluster, usize)> = clusters
            .into_iter()
            .map(|cluster| {
                let support = match self.mode {
                    HotspotMode::SinglePoint => cluster.support(),
                    HotspotMode::GapSpan => {
                        let pos = cluster.mean_midpoint();
                        let mut rows: Vec<usize> = cluster
                            .members
                            .iter()
                            .map(|g| g.row)
                            .chain(
                                all_gaps
                                    .iter()
                                    .filter(|g| g.contains(pos))
                                    .map(|g| g.row),
                            )
                            .collect();
                        rows.sort_unstable();
                        rows.dedup();
                        rows.len()
                    }
                };
                (cluster, support)
            })
            .collect();

        // Tier 1: at least two contributing rows.
        let survivors: Vec<(GapCluster, usize)> = supported
            .into_iter()
            .filter(|(_, support)| *support >= 2)
            .collect();
        if survivors.is_empty() {
            return None;
        }

        // Tier 2: drop clusters well below the typical survivor support.
        let supports: Vec<f64> = survivors.iter().map(|(_, s)| *s as f64).collect();
        let support_floor = HOTSPOT_SUPPORT_RATIO * median(&supports).unwrap_or(0.0);

        let columns: Vec<BoundaryPoint> = survivors
            .into_iter()
            .filter(|(_, support)| *support as f64 >= support_floor)
            .map(|(cluster, support)| {
                BoundaryPoint::new(
                    cluster.min_midpoint(),
                    cluster.max_midpoint(),
                    support as f64 / row_count as f64,
                    self.name(),
                )
            })
            .collect();
        if columns.is_empty() {
            return None;
        }

        let rows = row_boundary_points(ctx, self.name());
        Some(BoundaryHypothesis::new(self.name(), columns, rows))
    }
}

// ─── Cliff ─────────────────────────────────────────────────────────────────

/// Where the cliff search pools its gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliffMode {
    /// Pool gaps from every row into one search.
    Global,
    /// Search independently per row, then cluster candidates across rows;
    /// trades localization for robustness to rows with atypical gap
    /// distributions.
    PerRow,
}

/// Detects column boundaries by finding the "cliff" in the sorted gap-size
/// distribution: the largest consecutive ratio separates intra-cell gaps
/// from column-separating gaps.
#[derive(Debug, Clone, Copy)]
pub struct Cliff {
    mode: CliffMode,
}

impl Cliff {
    pub fn new(mode: CliffMode) -> Self {
        Self { mode }
    }

    pub fn global() -> Self {
        Self::new(CliffMode::Global)
    }

    pub fn per_row() -> Self {
        Self::new(CliffMode::PerRow)
    }
}

/// Find the cliff in a set of gaps: the sorted-size index pair with the
/// largest consecutive ratio. Returns the cliff value (gaps strictly above
/// it are column candidates) and the confidence `ratio/(ratio+1)`.
pub(crate) fn find_cliff(gaps: &[Gap]) -> Option<(f64, f64)> {
    if gaps.len() < 2 {
        return None;
    }
    let mut sizes: Vec<f64> = gaps.iter().map(Gap::size).collect();
    sizes.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut best: Option<(f64, f64)> = None;
    for pair in sizes.windows(2) {
        if pair[0] <= 0.0 {
            continue;
        }
        let ratio = pair[1] / pair[0];
        if best.is_none_or(|(_, best_ratio)| ratio > best_ratio) {
            best = Some((pair[0], ratio));
        }
    }
    let (cliff_value, ratio) = best?;
    if ratio <= 1.0 {
        // No separation in the distribution — every gap looks alike.
        return None;
    }
    Some((cliff_value, ratio / (ratio + 1.0)))
}

impl StructureMethod for Cliff {
    fn name(&self) -> &'static str {
        match self.mode {
            CliffMode::Global => CLIFF_GLOBAL,
            CliffMode::PerRow => CLIFF_PER_ROW,
        }
    }

    fn detect(&self, ctx: &TableContext<'_>) -> Option<BoundaryHypothesis> {
        let row_count = ctx.rows().len();
        if row_count == 0 {
            return None;
        }
        let gaps = qualifying_gaps(ctx);
        let tolerance = gap_cluster_tolerance(ctx);

        // Candidate gaps above the cliff, each tagged with its confidence.
        let candidates: Vec<(Gap, f64)> = match self.mode {
            CliffMode::Global => {
                let (cliff_value, confidence) = find_cliff(&gaps)?;
                gaps.iter()
                    .filter(|g| g.size() > cliff_value)
                    .map(|g| (*g, confidence))
                    .collect()
            }
            CliffMode::PerRow => {
                let mut out = Vec::new();
                for row_idx in 0..row_count {
                    let row_gaps: Vec<Gap> =
                        gaps.iter().filter(|g| g.row == row_idx).copied().collect();
                    if let Some((cliff_value, confidence)) = find_cliff(&row_gaps) {
                        out.extend(
                            row_gaps
                                .iter()
                                .filter(|g| g.size() > cliff_value)
                                .map(|g| (*g, confidence)),
                        );
                    }
                }
                out
            }
        };
        if candidates.is_empty() {
            return None;
        }

        // Cluster candidates across rows; a cluster's confidence is the
        // mean of its members'.
        let confidences: Vec<(f64, f64)> = candidates
            .iter()
            .map(|(g, c)| (g.midpoint(), *c))
            .collect();
        let clusters = cluster_gaps(candidates.into_iter().map(|(g, _)| g).collect(), tolerance);

        let columns: Vec<BoundaryPoint> = clusters
            .into_iter()
            .map(|cluster| {
                let lo = cluster.min_midpoint();
                let hi = cluster.max_midpoint();
                let member_confs: Vec<f64> = confidences
                    .iter()
                    .filter(|(mid, _)| *mid >= lo && *mid <= hi)
                    .map(|(_, c)| *c)
                    .collect();
                let confidence = if member_confs.is_empty() {
                    0.5
                } else {
                    member_confs.iter().sum::<f64>() / member_confs.len() as f64
                };
                BoundaryPoint::new(lo, hi, confidence, self.name())
            })
            .collect();

        let rows = row_boundary_points(ctx, self.name());
        Some(BoundaryHypothesis::new(self.name(), columns, rows))
    }
}

// ─── Header anchor ─────────────────────────────────────────────────────────

/// Uses the most-segmented top row as a column template.
///
/// The topmost row with the most inter-word gaps anchors the boundaries at
/// confidence 0.9 — 0.95 when the next row's gap structure matches within
/// tolerance, signalling a two-row header.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderAnchor;

impl StructureMethod for HeaderAnchor {
    fn name(&self) -> &'static str {
        HEADER_ANCHOR
    }

    fn detect(&self, ctx: &TableContext<'_>) -> Option<BoundaryHypothesis> {
        let row_count = ctx.rows().len();
        if row_count == 0 {
            return None;
        }
        let gaps = qualifying_gaps(ctx);

        let gaps_in_row = |row: usize| -> Vec<Gap> {
            gaps.iter().filter(|g| g.row == row).copied().collect()
        };

        // Topmost row with the most gaps (strictly-greater keeps the tie on
        // the earlier row).
        let mut anchor_row = 0usize;
        let mut anchor_count = 0usize;
        for row in 0..row_count {
            let count = gaps_in_row(row).len();
            if count > anchor_count {
                anchor_count = count;
                anchor_row = row;
            }
        }
        if anchor_count == 0 {
            return None;
        }

        let anchor_gaps = gaps_in_row(anchor_row);
        let tolerance = gap_cluster_tolerance(ctx);

        // Two-row header: the next row shows the same gap structure.
        let next_gaps = gaps_in_row(anchor_row + 1);
        let two_row = next_gaps.len() == anchor_gaps.len()
            && anchor_gaps
                .iter()
                .zip(next_gaps.iter())
                .all(|(a, b)| (a.midpoint() - b.midpoint()).abs() <= tolerance);
        let confidence = if two_row { 0.95 } else { 0.9 };

        let columns: Vec<BoundaryPoint> = anchor_gaps
            .iter()
            .map(|g| BoundaryPoint::new(g.start, g.end, confidence, HEADER_ANCHOR))
            .collect();
        let rows = row_boundary_points(ctx, HEADER_ANCHOR);

        Some(
            BoundaryHypothesis::new(HEADER_ANCHOR, columns, rows)
                .with_metadata("anchor_row", anchor_row.to_string())
                .with_metadata("two_row_header", two_row.to_string()),
        )
    }
}
