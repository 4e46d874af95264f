//! The extraction pipeline: activate, detect, combine, extract, score,
//! post-process.
//!
//! Every method invocation is crash-isolated: a panicking detector, cell
//! extractor, or repair step is converted into a [`MethodError`] record and
//! the run continues with whatever the other methods produced. The
//! pipeline itself never panics and never returns an error; the worst
//! outcome is an empty table with a populated error list.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tablewright_core::boundary::BoundaryHypothesis;
use tablewright_core::cells::CellMethod;
use tablewright_core::combine;
use tablewright_core::context::TableContext;
use tablewright_core::error::{MethodError, MethodTiming, Stage};
use tablewright_core::geometry::BBox;
use tablewright_core::grid::CellGrid;
use tablewright_core::input::PageContent;
use tablewright_core::scoring;
use tablewright_core::structure::StructureMethod;

use crate::config::PipelineConfig;
use crate::result::ExtractionResult;

/// Timing-tag for the scoring stage, which is not a named method.
const SCORING: &str = "rank_aggregation";

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Outcome of one isolated method invocation.
struct Isolated<T> {
    value: Option<T>,
    timing: MethodTiming,
    error: Option<MethodError>,
}

/// Run `f` with panic isolation, recording timing either way.
fn isolated<T>(method: &str, stage: Stage, f: impl FnOnce() -> T) -> Isolated<T> {
    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    let elapsed = start.elapsed();
    match outcome {
        Ok(value) => Isolated {
            value: Some(value),
            timing: MethodTiming::new(method, stage, elapsed),
            error: None,
        },
        Err(payload) => {
            let error = MethodError::new(method, stage, panic_message(payload.as_ref()), elapsed);
            tracing::warn!(%error, "method fault isolated");
            Isolated {
                value: None,
                timing: MethodTiming::new(method, stage, elapsed),
                error: Some(error),
            }
        }
    }
}

/// One cell-extraction job: a hypothesis paired with a cell method.
struct CellJob<'a> {
    hypothesis: &'a BoundaryHypothesis,
    method: &'a dyn CellMethod,
}

/// The table-structure recovery pipeline.
///
/// ```no_run
/// use tablewright::{PipelineConfig, TableExtractor};
/// use tablewright_core::{BBox, PageContent};
///
/// let page = PageContent::default();
/// let extractor = TableExtractor::new(PipelineConfig::default());
/// let result = extractor.extract(&page, BBox::new(0.0, 0.0, 612.0, 300.0));
/// println!("{} rows", result.table.rows.len());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TableExtractor {
    config: PipelineConfig,
}

impl TableExtractor {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Recover the table inside `bbox`.
    pub fn extract(&self, page: &PageContent, bbox: BBox) -> ExtractionResult {
        let ctx = TableContext::new(page, bbox);
        let detections: Vec<Isolated<Option<BoundaryHypothesis>>> = self
            .active_methods(&ctx)
            .map(|m| Self::detect_one(m, &ctx))
            .collect();
        self.assemble(&ctx, detections, |jobs: &[CellJob<'_>], ctx: &TableContext<'_>| {
            jobs.iter().map(|job| Self::extract_one(job, ctx)).collect()
        })
    }

    /// Recover the table inside `bbox`, fanning detection and cell
    /// extraction out over rayon. Output is identical to [`extract`](Self::extract).
    #[cfg(feature = "parallel")]
    pub fn extract_parallel(&self, page: &PageContent, bbox: BBox) -> ExtractionResult {
        use rayon::prelude::*;

        let ctx = TableContext::new(page, bbox);
        // Materialize the cached context views before fanning out.
        ctx.rows();
        ctx.segments();
        let methods: Vec<&dyn StructureMethod> = self.active_methods(&ctx).collect();
        let detections: Vec<Isolated<Option<BoundaryHypothesis>>> = methods
            .into_par_iter()
            .map(|m| Self::detect_one(m, &ctx))
            .collect();
        self.assemble(&ctx, detections, |jobs: &[CellJob<'_>], ctx: &TableContext<'_>| {
            jobs.par_iter().map(|job| Self::extract_one(job, ctx)).collect()
        })
    }

    fn active_methods<'s>(
        &'s self,
        ctx: &'s TableContext<'_>,
    ) -> impl Iterator<Item = &'s dyn StructureMethod> {
        self.config.structure_methods.iter().filter_map(move |m| {
            if self.config.is_active(m.name(), ctx) {
                Some(m.as_ref())
            } else {
                tracing::debug!(method = m.name(), "skipped by activation rule");
                None
            }
        })
    }

    fn detect_one(
        method: &dyn StructureMethod,
        ctx: &TableContext<'_>,
    ) -> Isolated<Option<BoundaryHypothesis>> {
        isolated(method.name(), Stage::Detect, || method.detect(ctx))
    }

    fn extract_one(job: &CellJob<'_>, ctx: &TableContext<'_>) -> Isolated<Option<CellGrid>> {
        let columns = job.hypothesis.column_positions();
        let rows = job.hypothesis.row_positions();
        let mut outcome = isolated(job.method.name(), Stage::ExtractCells, || {
            job.method.extract(ctx, &columns, &rows)
        });
        if let Some(Some(grid)) = outcome.value.as_mut() {
            grid.structure_method = job.hypothesis.method.clone();
        }
        outcome
    }

    /// Shared back half of the pipeline: combine, extract cells, score,
    /// post-process. `run_jobs` abstracts over the serial and parallel
    /// cell-extraction fan-out.
    fn assemble<F>(
        &self,
        ctx: &TableContext<'_>,
        detections: Vec<Isolated<Option<BoundaryHypothesis>>>,
        run_jobs: F,
    ) -> ExtractionResult
    where
        F: for<'j> Fn(&[CellJob<'j>], &TableContext<'_>) -> Vec<Isolated<Option<CellGrid>>>,
    {
        let mut result = ExtractionResult::default();
        for detection in detections {
            result.timings.push(detection.timing);
            result.errors.extend(detection.error);
            if let Some(Some(hypothesis)) = detection.value {
                if !hypothesis.is_empty() {
                    result.hypotheses.push(hypothesis);
                }
            }
        }

        if result.hypotheses.is_empty() {
            tracing::debug!("no structure hypotheses; returning empty table");
            return result;
        }

        let cell_methods: Vec<&dyn CellMethod> = self
            .config
            .cell_methods
            .iter()
            .filter_map(|m| {
                if self.config.is_active(m.name(), ctx) {
                    Some(m.as_ref())
                } else {
                    tracing::debug!(method = m.name(), "skipped by activation rule");
                    None
                }
            })
            .collect();
        fn jobs_for<'j>(
            sources: &[&'j BoundaryHypothesis],
            methods: &[&'j dyn CellMethod],
        ) -> Vec<CellJob<'j>> {
            sources
                .iter()
                .flat_map(|hypothesis| {
                    methods.iter().map(|method| CellJob {
                        hypothesis,
                        method: *method,
                    })
                })
                .collect()
        }
        fn collect_grids(
            result: &mut ExtractionResult,
            outcomes: Vec<Isolated<Option<CellGrid>>>,
        ) {
            for outcome in outcomes {
                result.timings.push(outcome.timing);
                result.errors.extend(outcome.error);
                if let Some(Some(grid)) = outcome.value {
                    result.candidates.push(grid);
                }
            }
        }

        // Cell extraction per hypothesis.
        let sources: Vec<&BoundaryHypothesis> = result.hypotheses.iter().collect();
        let outcomes = run_jobs(&jobs_for(&sources, &cell_methods), ctx);
        drop(sources);
        collect_grids(&mut result, outcomes);

        // Combine, then extract from the consensus boundaries.
        let combined = isolated(combine::CONSENSUS, Stage::Combine, || {
            combine::combine(ctx, &result.hypotheses, &self.config.confidence_multipliers)
        });
        result.timings.push(combined.timing);
        result.errors.extend(combined.error);
        result.consensus = combined.value;

        if let Some(consensus) = &result.consensus {
            let outcomes = run_jobs(&jobs_for(&[consensus], &cell_methods), ctx);
            collect_grids(&mut result, outcomes);
        }

        if result.candidates.is_empty() {
            tracing::debug!("no candidate grids survived cell extraction");
            return result;
        }

        // Score and select.
        let scored = isolated(SCORING, Stage::Score, || {
            scoring::score_grids(&result.candidates)
        });
        result.timings.push(scored.timing);
        result.errors.extend(scored.error);
        if let Some(scores) = scored.value {
            result.winner = scoring::select_best(&scores);
            result.scores = scores;
        }
        // A scoring fault falls back to the first candidate.
        let winner = result.winner.unwrap_or(0);
        let mut table = result.candidates[winner].clone();

        // Post-process. A faulting step keeps the grid it received.
        for step in &self.config.post_processors {
            let repaired = isolated(step.name(), Stage::PostProcess, || step.apply(&table, ctx));
            result.timings.push(repaired.timing);
            result.errors.extend(repaired.error);
            if let Some(next) = repaired.value {
                table = next;
            }
        }

        result.table = table;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::sync::Arc;
    use tablewright_core::input::Word;

    /// Three columns, four visual rows, gutters at x≈60 and x≈130.
    fn three_column_page() -> PageContent {
        let mut words = Vec::new();
        for r in 0..4 {
            let top = 10.0 + r as f64 * 60.0;
            words.push(Word::new(
                format!("r{r}a"),
                BBox::new(10.0, top, 40.0, top + 10.0),
            ));
            words.push(Word::new(
                format!("r{r}b"),
                BBox::new(80.0, top, 110.0, top + 10.0),
            ));
            words.push(Word::new(
                format!("r{r}c"),
                BBox::new(150.0, top, 180.0, top + 10.0),
            ));
        }
        PageContent {
            words,
            width: 612.0,
            height: 792.0,
            ..PageContent::default()
        }
    }

    struct PanickingDetector;

    impl StructureMethod for PanickingDetector {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn detect(&self, _ctx: &TableContext<'_>) -> Option<BoundaryHypothesis> {
            panic!("intentional detector fault");
        }
    }

    #[test]
    fn test_empty_page_produces_empty_result() {
        let page = PageContent::default();
        let extractor = TableExtractor::new(PipelineConfig::default());
        let result = extractor.extract(&page, BBox::new(0.0, 0.0, 600.0, 400.0));
        assert!(result.is_empty());
        assert!(result.hypotheses.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_detector_panic_is_isolated() {
        let page = PageContent::default();
        let config = PipelineConfig::minimal().with_structure_method(Arc::new(PanickingDetector));
        let result =
            TableExtractor::new(config).extract(&page, BBox::new(0.0, 0.0, 600.0, 400.0));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].method, "panicking");
        assert_eq!(result.errors[0].stage, Stage::Detect);
        assert!(result.errors[0].message.contains("intentional"));
        // Timings recorded for both the healthy and the faulting method.
        assert_eq!(result.timings.len(), 2);
    }

    #[test]
    #[cfg(feature = "parallel")]
    fn test_parallel_matches_sequential() {
        let page = three_column_page();
        let bbox = BBox::new(0.0, 0.0, 190.0, 210.0);
        let extractor = TableExtractor::new(PipelineConfig::default());

        let sequential = extractor.extract(&page, bbox);
        let parallel = extractor.extract_parallel(&page, bbox);

        assert!(!sequential.is_empty());
        assert_eq!(parallel.table, sequential.table);
        assert_eq!(parallel.hypotheses, sequential.hypotheses);
        assert_eq!(parallel.consensus, sequential.consensus);
        assert_eq!(parallel.candidates, sequential.candidates);
        assert_eq!(parallel.scores, sequential.scores);
        assert_eq!(parallel.winner, sequential.winner);
        assert!(parallel.errors.is_empty());
    }

    #[test]
    #[cfg(feature = "parallel")]
    fn test_parallel_isolates_detector_panic_like_sequential() {
        let page = three_column_page();
        let bbox = BBox::new(0.0, 0.0, 190.0, 210.0);
        let config = PipelineConfig::minimal().with_structure_method(Arc::new(PanickingDetector));
        let extractor = TableExtractor::new(config);

        let sequential = extractor.extract(&page, bbox);
        let parallel = extractor.extract_parallel(&page, bbox);

        // Elapsed times differ between runs; the recorded faults must not.
        let fault = |e: &MethodError| (e.method.clone(), e.stage, e.message.clone());
        assert_eq!(
            parallel.errors.iter().map(fault).collect::<Vec<_>>(),
            sequential.errors.iter().map(fault).collect::<Vec<_>>()
        );
        assert_eq!(parallel.table, sequential.table);
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("str payload");
        assert_eq!(panic_message(boxed.as_ref()), "str payload");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("string payload"));
        assert_eq!(panic_message(boxed.as_ref()), "string payload");
        let boxed: Box<dyn Any + Send> = Box::new(17u8);
        assert!(panic_message(boxed.as_ref()).contains("non-string"));
    }
}
