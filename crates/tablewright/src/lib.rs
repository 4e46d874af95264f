//! tablewright: Recover table structure from document geometry.
//!
//! This is the public API facade crate for tablewright-rs. It re-exports
//! types from tablewright-core and adds the configurable, crash-isolated
//! extraction pipeline on top.
//!
//! # Architecture
//!
//! - **tablewright-core**: Backend-independent types, detectors, and repairs
//! - **tablewright** (this crate): Pipeline configuration and orchestration
//!
//! # Quick start
//!
//! ```no_run
//! use tablewright::{PipelineConfig, TableExtractor};
//! use tablewright::core::{BBox, PageContent};
//!
//! let page = PageContent::default(); // words, segments, font spans
//! let extractor = TableExtractor::new(PipelineConfig::default());
//! let result = extractor.extract(&page, BBox::new(36.0, 100.0, 576.0, 400.0));
//! for row in &result.table.rows {
//!     println!("{}", row.join(" | "));
//! }
//! ```

pub use tablewright_core as core;

mod config;
mod pipeline;
mod result;

pub use config::{ActivationRule, PipelineConfig};
pub use pipeline::TableExtractor;
pub use result::ExtractionResult;

pub use tablewright_core::boundary::{BoundaryHypothesis, BoundaryPoint};
pub use tablewright_core::error::{MethodError, MethodTiming, Stage};
pub use tablewright_core::geometry::BBox;
pub use tablewright_core::grid::CellGrid;
pub use tablewright_core::input::{FontSpan, PageContent, Segment, TextBlock, Word};
