//! Crash-isolation tests: a faulting method never takes the table down.

use std::sync::Arc;

use tablewright::core::boundary::BoundaryHypothesis;
use tablewright::core::cells::CellMethod;
use tablewright::core::context::TableContext;
use tablewright::core::geometry::BBox;
use tablewright::core::grid::CellGrid;
use tablewright::core::input::{PageContent, Word};
use tablewright::core::postprocess::PostProcessor;
use tablewright::{PipelineConfig, Stage, TableExtractor};

fn two_column_page() -> PageContent {
    let mut words = Vec::new();
    for r in 0..4 {
        let top = 10.0 + r as f64 * 60.0;
        words.push(Word::new(
            format!("l{r}"),
            BBox::new(10.0, top, 60.0, top + 10.0),
        ));
        words.push(Word::new(
            format!("r{r}"),
            BBox::new(120.0, top, 170.0, top + 10.0),
        ));
    }
    PageContent {
        words,
        width: 612.0,
        height: 792.0,
        ..PageContent::default()
    }
}

fn table_bbox() -> BBox {
    BBox::new(0.0, 0.0, 180.0, 210.0)
}

struct PanickingCells;

impl CellMethod for PanickingCells {
    fn name(&self) -> &'static str {
        "panicking_cells"
    }

    fn extract(
        &self,
        _ctx: &TableContext<'_>,
        _col_positions: &[f64],
        _row_positions: &[f64],
    ) -> Option<CellGrid> {
        panic!("cell extraction fault");
    }
}

struct PanickingRepair;

impl PostProcessor for PanickingRepair {
    fn name(&self) -> &'static str {
        "panicking_repair"
    }

    fn apply(&self, _grid: &CellGrid, _ctx: &TableContext<'_>) -> CellGrid {
        panic!("repair fault");
    }
}

#[test]
fn cell_method_panic_leaves_other_candidates() {
    let config = PipelineConfig::minimal().with_cell_method(Arc::new(PanickingCells));
    let result = TableExtractor::new(config).extract(&two_column_page(), table_bbox());

    // One hypothesis plus its consensus passthrough, two cell methods:
    // the faulting one fails twice, the healthy one produces twice.
    assert_eq!(result.errors.len(), 2);
    assert!(result
        .errors
        .iter()
        .all(|e| e.stage == Stage::ExtractCells && e.method == "panicking_cells"));
    assert!(result.errors[0].message.contains("cell extraction fault"));
    assert_eq!(result.candidates.len(), 2);
    assert_eq!(result.table.headers, vec!["l0", "r0"]);
    assert_eq!(result.table.rows.len(), 3);
}

#[test]
fn post_processor_panic_keeps_the_grid_it_received() {
    let config = PipelineConfig::minimal().with_post_processor(Arc::new(PanickingRepair));
    let result = TableExtractor::new(config).extract(&two_column_page(), table_bbox());

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].stage, Stage::PostProcess);
    assert_eq!(result.errors[0].method, "panicking_repair");
    // The table that entered the faulting step survives untouched.
    assert_eq!(result.table.headers, vec!["l0", "r0"]);
    assert_eq!(result.table.rows.len(), 3);
}

#[test]
fn all_methods_faulting_yields_empty_table_not_a_crash() {
    struct PanickingDetector;
    impl tablewright::core::structure::StructureMethod for PanickingDetector {
        fn name(&self) -> &'static str {
            "panicking_detector"
        }
        fn detect(&self, _ctx: &TableContext<'_>) -> Option<BoundaryHypothesis> {
            panic!("detector fault");
        }
    }

    let config = PipelineConfig {
        structure_methods: vec![Arc::new(PanickingDetector)],
        ..PipelineConfig::minimal()
    };
    let result = TableExtractor::new(config).extract(&two_column_page(), table_bbox());

    assert!(result.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].stage, Stage::Detect);
    assert!(result.hypotheses.is_empty());
}
