//! Input contract types supplied by the page backend.
//!
//! A backend hands the engine one [`PageContent`] per page: word tokens with
//! positions, drawing-line segments with endpoints, and text blocks carrying
//! span-level font metadata. tablewright never reads the document itself.

use crate::geometry::BBox;

/// A word token: text plus its position rectangle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Word {
    /// The text content of this word.
    pub text: String,
    /// Bounding box of the word on the page.
    pub bbox: BBox,
}

impl Word {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// A drawing-line segment (one polyline leg) with stroke width.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    /// Stroke width of the drawn line.
    pub width: f64,
}

impl Segment {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64, width: f64) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            width,
        }
    }
}

/// A run of text in a single font within a text block.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontSpan {
    /// The span text.
    pub text: String,
    /// Bounding box of the span.
    pub bbox: BBox,
    /// Font name as reported by the backend (e.g. "TimesNewRoman-Bold").
    pub font_name: String,
    /// Font size in points.
    pub size: f64,
    /// Whether the font is flagged bold.
    pub bold: bool,
}

/// A text block: a group of spans sharing a layout region.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextBlock {
    /// Bounding box enclosing all spans.
    pub bbox: BBox,
    /// Font spans within the block.
    pub spans: Vec<FontSpan>,
}

/// Everything the engine needs from one page.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageContent {
    /// All word tokens on the page.
    pub words: Vec<Word>,
    /// All drawing-line segments on the page.
    pub segments: Vec<Segment>,
    /// All text blocks with font metadata.
    pub blocks: Vec<TextBlock>,
    /// Page width.
    pub width: f64,
    /// Page height.
    pub height: f64,
}
