/// Bounding box with top-left origin coordinate system.
///
/// Coordinates follow the page convention used throughout tablewright:
/// - `x0`: left edge
/// - `top`: top edge (distance from top of page)
/// - `x1`: right edge
/// - `bottom`: bottom edge (distance from top of page)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Width of the bounding box.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the bounding box.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Area of the bounding box (0.0 for degenerate boxes).
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Horizontal center.
    pub fn x_center(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical center.
    pub fn y_center(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Compute the union of two bounding boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Intersection of two bounding boxes, or `None` when they do not overlap.
    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        let x0 = self.x0.max(other.x0);
        let top = self.top.max(other.top);
        let x1 = self.x1.min(other.x1);
        let bottom = self.bottom.min(other.bottom);
        if x0 < x1 && top < bottom {
            Some(BBox::new(x0, top, x1, bottom))
        } else {
            None
        }
    }

    /// Overlap area with another bounding box (0.0 when disjoint).
    pub fn overlap_area(&self, other: &BBox) -> f64 {
        self.intersection(other).map_or(0.0, |b| b.area())
    }

    /// Whether the point (x, y) lies inside this box (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.top && y <= self.bottom
    }
}

/// Orientation of a line segment relative to the page axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
    Diagonal,
}

/// Maximum deviation from axis (in degrees) for a segment to count as
/// horizontal or vertical.
pub const AXIS_ANGLE_TOLERANCE_DEG: f64 = 5.0;

/// Classify a segment's orientation from its endpoints.
///
/// A segment within [`AXIS_ANGLE_TOLERANCE_DEG`] of an axis is treated as
/// lying on that axis; everything else is diagonal. Zero-length segments
/// are diagonal (they carry no directional signal).
pub fn classify_orientation(x0: f64, y0: f64, x1: f64, y1: f64) -> Orientation {
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    if dx == 0.0 && dy == 0.0 {
        return Orientation::Diagonal;
    }
    let angle = dy.atan2(dx).to_degrees();
    if angle <= AXIS_ANGLE_TOLERANCE_DEG {
        Orientation::Horizontal
    } else if angle >= 90.0 - AXIS_ANGLE_TOLERANCE_DEG {
        Orientation::Vertical
    } else {
        Orientation::Diagonal
    }
}

/// Median of a slice of values. Returns `None` for an empty slice.
///
/// Uses the mean of the two middle elements for even-length input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}
