//! Pipeline configuration: which methods run, when, and how loudly they
//! vote.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tablewright_core::cells::{CellMethod, CropExtract, OverlapAssignment, WordAssignment};
use tablewright_core::context::TableContext;
use tablewright_core::postprocess::{self, PostProcessor};
use tablewright_core::structure::{
    self, Cliff, HeaderAnchor, Hotspot, RuledLineDetection, StructureMethod,
};

/// Predicate deciding whether a method runs for a given region.
pub type ActivationRule = Arc<dyn Fn(&TableContext<'_>) -> bool + Send + Sync>;

/// Declarative pipeline configuration.
///
/// Methods run in the order they appear. A method with no activation rule
/// always runs; confidence multipliers rescale a method's votes during
/// combination and default to 1.0 when absent.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Structure detection methods, in invocation order.
    pub structure_methods: Vec<Arc<dyn StructureMethod>>,
    /// Cell extraction methods, applied to every hypothesis.
    pub cell_methods: Vec<Arc<dyn CellMethod>>,
    /// Post-processing chain for the winning grid, in application order.
    pub post_processors: Vec<Arc<dyn PostProcessor>>,
    /// Per-method activation predicates, keyed by method name.
    pub activation_rules: HashMap<String, ActivationRule>,
    /// Per-method vote weights, keyed by method name.
    pub confidence_multipliers: BTreeMap<String, f64>,
    /// Combination strategy tag, kept for forward-compatible dispatch.
    /// Only `"consensus"` exists today.
    pub combination_strategy: String,
    /// Selection strategy tag, kept for forward-compatible dispatch.
    /// Only `"rank_aggregation"` exists today.
    pub selection_strategy: String,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field(
                "structure_methods",
                &self
                    .structure_methods
                    .iter()
                    .map(|m| m.name())
                    .collect::<Vec<_>>(),
            )
            .field(
                "cell_methods",
                &self.cell_methods.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field(
                "post_processors",
                &self
                    .post_processors
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .field(
                "activation_rules",
                &self.activation_rules.keys().collect::<Vec<_>>(),
            )
            .field("confidence_multipliers", &self.confidence_multipliers)
            .field("combination_strategy", &self.combination_strategy)
            .field("selection_strategy", &self.selection_strategy)
            .finish()
    }
}

impl Default for PipelineConfig {
    /// Full pipeline: every detector, every cell method, the standard
    /// post-processing chain. Ruled-line detection is gated on the region
    /// actually containing ruling.
    fn default() -> Self {
        let mut activation_rules: HashMap<String, ActivationRule> = HashMap::new();
        activation_rules.insert(
            structure::RULED_LINES.to_string(),
            Arc::new(|ctx: &TableContext<'_>| ctx.has_ruled_lines()),
        );
        Self {
            structure_methods: vec![
                Arc::new(RuledLineDetection),
                Arc::new(Hotspot::single_point()),
                Arc::new(Hotspot::gap_span()),
                Arc::new(Cliff::global()),
                Arc::new(Cliff::per_row()),
                Arc::new(HeaderAnchor),
            ],
            cell_methods: vec![
                Arc::new(WordAssignment),
                Arc::new(OverlapAssignment),
                Arc::new(CropExtract),
            ],
            post_processors: postprocess::standard_chain()
                .into_iter()
                .map(Arc::from)
                .collect(),
            activation_rules,
            confidence_multipliers: BTreeMap::new(),
            combination_strategy: "consensus".to_string(),
            selection_strategy: "rank_aggregation".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Cheapest useful pipeline: two gap detectors, one cell method,
    /// standard repairs.
    pub fn fast() -> Self {
        Self {
            structure_methods: vec![
                Arc::new(Hotspot::single_point()),
                Arc::new(Cliff::global()),
            ],
            cell_methods: vec![Arc::new(WordAssignment)],
            activation_rules: HashMap::new(),
            ..Self::default()
        }
    }

    /// Ruled tables only. Useful when the source is known to draw its
    /// grids.
    pub fn ruled() -> Self {
        Self {
            structure_methods: vec![Arc::new(RuledLineDetection)],
            cell_methods: vec![Arc::new(WordAssignment)],
            activation_rules: HashMap::new(),
            ..Self::default()
        }
    }

    /// One detector, one cell method, no repairs. Primarily for tests and
    /// debugging.
    pub fn minimal() -> Self {
        Self {
            structure_methods: vec![Arc::new(Hotspot::single_point())],
            cell_methods: vec![Arc::new(WordAssignment)],
            post_processors: Vec::new(),
            activation_rules: HashMap::new(),
            confidence_multipliers: BTreeMap::new(),
            combination_strategy: "consensus".to_string(),
            selection_strategy: "rank_aggregation".to_string(),
        }
    }

    /// Append a structure method.
    pub fn with_structure_method(mut self, method: Arc<dyn StructureMethod>) -> Self {
        self.structure_methods.push(method);
        self
    }

    /// Append a cell method.
    pub fn with_cell_method(mut self, method: Arc<dyn CellMethod>) -> Self {
        self.cell_methods.push(method);
        self
    }

    /// Append a post-processing step.
    pub fn with_post_processor(mut self, step: Arc<dyn PostProcessor>) -> Self {
        self.post_processors.push(step);
        self
    }

    /// Gate `method` behind `rule`.
    pub fn with_activation_rule(
        mut self,
        method: impl Into<String>,
        rule: ActivationRule,
    ) -> Self {
        self.activation_rules.insert(method.into(), rule);
        self
    }

    /// Set the vote weight for `method`.
    pub fn with_confidence_multiplier(mut self, method: impl Into<String>, weight: f64) -> Self {
        self.confidence_multipliers.insert(method.into(), weight);
        self
    }

    /// Merge confidence multipliers from a JSON document of the form
    /// `{"confidence_multipliers": {"method": 0.8, ...}}`, producing a new
    /// config.
    ///
    /// Malformed input is logged and ignored; existing weights stay in
    /// place. Non-numeric entries are skipped individually.
    pub fn with_weights_json(mut self, json: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed weights document");
                return self;
            }
        };
        let Some(table) = value
            .get("confidence_multipliers")
            .and_then(|v| v.as_object())
        else {
            tracing::warn!("weights document has no confidence_multipliers object");
            return self;
        };
        for (method, weight) in table {
            match weight.as_f64() {
                Some(w) => {
                    self.confidence_multipliers.insert(method.clone(), w);
                }
                None => {
                    tracing::warn!(method = %method, "skipping non-numeric weight");
                }
            }
        }
        self
    }

    /// Load and merge a weights file, producing a new config. An unreadable
    /// file is logged and ignored.
    pub fn with_weights_file(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => self.with_weights_json(&contents),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "weights file unreadable");
                self
            }
        }
    }

    /// True when `method` should run for `ctx`.
    pub fn is_active(&self, method: &str, ctx: &TableContext<'_>) -> bool {
        match self.activation_rules.get(method) {
            Some(rule) => rule(ctx),
            None => true,
        }
    }

    /// Vote weight for `method` (1.0 when unset).
    pub fn multiplier(&self, method: &str) -> f64 {
        self.confidence_multipliers.get(method).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runs_all_detectors() {
        let config = PipelineConfig::default();
        assert_eq!(config.structure_methods.len(), 6);
        assert_eq!(config.cell_methods.len(), 3);
        assert_eq!(config.post_processors.len(), 7);
    }

    #[test]
    fn test_merge_weights_json() {
        let config = PipelineConfig::minimal()
            .with_weights_json(r#"{"confidence_multipliers": {"cliff_global": 0.5, "bad": "x"}}"#);
        assert_eq!(config.confidence_multipliers.get("cliff_global"), Some(&0.5));
        assert!(!config.confidence_multipliers.contains_key("bad"));
    }

    #[test]
    fn test_merge_weights_json_malformed_keeps_existing() {
        let config = PipelineConfig::minimal()
            .with_confidence_multiplier("cliff_global", 0.7)
            .with_weights_json("{not json")
            .with_weights_json(r#"{"something_else": 1}"#);
        assert_eq!(config.confidence_multipliers.get("cliff_global"), Some(&0.7));
    }

    #[test]
    fn test_builders() {
        let config = PipelineConfig::minimal()
            .with_confidence_multiplier("hotspot_single", 0.9)
            .with_activation_rule("hotspot_single", Arc::new(|_| false));
        assert_eq!(config.multiplier("hotspot_single"), 0.9);
        assert_eq!(config.multiplier("unknown"), 1.0);
        assert_eq!(config.activation_rules.len(), 1);
    }
}
