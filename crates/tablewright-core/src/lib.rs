//! tablewright-core: Backend-independent table-structure recovery.
//!
//! This crate provides the foundational types (BBox, Word, Segment,
//! CellGrid, etc.) and algorithms (boundary detection, consensus
//! combination, cell extraction, grid scoring, post-processing) used by
//! tablewright-rs. Its only external dependency is `regex`.

pub mod boundary;
pub mod cells;
pub mod combine;
pub mod context;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod input;
pub mod postprocess;
pub mod scoring;
pub mod structure;

pub use boundary::{BoundaryHypothesis, BoundaryPoint};
pub use cells::CellMethod;
pub use context::TableContext;
pub use error::{MethodError, MethodTiming, Stage};
pub use geometry::{BBox, Orientation};
pub use grid::CellGrid;
pub use input::{FontSpan, PageContent, Segment, TextBlock, Word};
pub use postprocess::PostProcessor;
pub use scoring::{GridMetrics, GridScore};
pub use structure::StructureMethod;
