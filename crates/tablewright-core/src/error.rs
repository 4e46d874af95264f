//! Method failure records and timing.
//!
//! A faulting structure or cell method is never fatal to a table: the
//! orchestrator catches the fault, records a [`MethodError`], and continues
//! with whatever succeeded. These types are the structured record of that.

use std::fmt;
use std::time::Duration;

/// Pipeline stage in which a method ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    /// Structure detection (`detect`).
    Detect,
    /// Boundary combination / voting.
    Combine,
    /// Cell extraction (`extract`).
    ExtractCells,
    /// Grid scoring and selection.
    Score,
    /// Post-processing chain.
    PostProcess,
}

impl Stage {
    /// Returns the string tag for this stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Detect => "DETECT",
            Stage::Combine => "COMBINE",
            Stage::ExtractCells => "EXTRACT_CELLS",
            Stage::Score => "SCORE",
            Stage::PostProcess => "POSTPROCESS",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded, non-fatal method failure.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodError {
    /// Name of the failing method.
    pub method: String,
    /// Stage in which the failure occurred.
    pub stage: Stage,
    /// Human-readable description of the fault.
    pub message: String,
    /// Time spent in the method before it failed.
    pub elapsed: Duration,
}

impl MethodError {
    /// Create an error record.
    pub fn new(
        method: impl Into<String>,
        stage: Stage,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            method: method.into(),
            stage,
            message: message.into(),
            elapsed,
        }
    }
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} failed after {:?}: {}",
            self.stage, self.method, self.elapsed, self.message
        )
    }
}

impl std::error::Error for MethodError {}

/// Wall-clock time spent in one method invocation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodTiming {
    /// Method name (or a stage label for whole-stage timings).
    pub method: String,
    /// Stage in which the method ran.
    pub stage: Stage,
    /// Elapsed wall-clock time.
    pub elapsed: Duration,
}

impl MethodTiming {
    pub fn new(method: impl Into<String>, stage: Stage, elapsed: Duration) -> Self {
        Self {
            method: method.into(),
            stage,
            elapsed,
        }
    }
}
