//! Shared types for binary-mask shape analysis.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference masks
/// without depending on `image` directly.
///
/// A mask is a `GrayImage` restricted to the values 0 (background) and
/// 255 (foreground); anything else is rejected by
/// [`ContourAnalysis::from_mask`](crate::ContourAnalysis::from_mask).
pub use image::GrayImage;

/// A 2D point on the pixel-corner lattice, in integer coordinates.
///
/// Contours are polygons over pixel *corners* (crack boundaries), so a
/// solid `w`×`h` region traces to a polygon of exactly `2(w+h)`
/// perimeter, free of the half-pixel bias that pixel-center tracing
/// introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: i32,
    /// Vertical position (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }

    /// Convert to floating-point coordinates.
    #[must_use]
    pub fn to_f(self) -> PointF {
        PointF::new(f64::from(self.x), f64::from(self.y))
    }
}

/// A 2D point in floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl PointF {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box in mask coordinates.
///
/// `x`/`y` is the top-left corner; `width`/`height` are measured in
/// pixels. For a contour over the corner lattice this equals the pixel
/// extent of the enclosed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Bounding box of a corner-lattice polygon.
    ///
    /// Returns `None` for an empty point list.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y) = (first.x, first.y);
        let (mut max_x, mut max_y) = (first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x) as u32,
            height: (max_y - min_y) as u32,
        })
    }

    /// Area of the box in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Raw and central moments of a region's pixel-mass distribution, up to
/// second order.
///
/// `m20`/`m02`/`m11` are raw spatial moments about the origin;
/// `u20`/`u02` are central moments about the centroid. The engine never
/// computes these for caller-supplied blobs; an upstream detector
/// provides them. Blobs synthesized by the repair round trip carry
/// moments recomputed from the rasterized mask.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Moments {
    /// Raw second-order moment Σx².
    pub m20: f64,
    /// Raw second-order moment Σy².
    pub m02: f64,
    /// Raw mixed moment Σxy.
    pub m11: f64,
    /// Central moment Σ(x−x̄)².
    pub u20: f64,
    /// Central moment Σ(y−ȳ)².
    pub u02: f64,
}

/// A detected foreground region: closed contour, bounding box, raw
/// pixel-count area, and second-order moments.
///
/// Blobs arrive from an upstream blob detector or are synthesized by
/// [`repair::convex_hull_blob`](crate::repair::convex_hull_blob).
/// All shape metrics in [`metrics`](crate::metrics) are pure functions
/// of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// Ordered, closed boundary polygon. May be empty for a degenerate
    /// blob; metrics then return their documented zero values.
    pub contour: Vec<Point>,
    /// Axis-aligned bounding box of the region.
    pub bounding_box: BoundingBox,
    /// Raw pixel count of the region. This is the single source of
    /// truth for area; it is never recomputed from contour geometry.
    pub area: u32,
    /// Second-order moments of the region.
    pub moments: Moments,
}

impl Blob {
    /// Assemble a blob from externally detected statistics.
    #[must_use]
    pub const fn new(
        contour: Vec<Point>,
        bounding_box: BoundingBox,
        area: u32,
        moments: Moments,
    ) -> Self {
        Self {
            contour,
            bounding_box,
            area,
            moments,
        }
    }
}

/// A rotated rectangle: center, side lengths, and rotation angle in
/// degrees. Produced by
/// [`metrics::min_area_rectangle`](crate::metrics::min_area_rectangle).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatedRect {
    /// Center of the rectangle.
    pub center: PointF,
    /// Length of the first pair of sides.
    pub width: f64,
    /// Length of the second pair of sides.
    pub height: f64,
    /// Rotation of the `width` sides from the x axis, in degrees.
    pub angle: f64,
}

/// Configuration for mask analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Ramer-Douglas-Peucker simplification tolerance in pixels,
    /// applied to every traced contour. Must be non-negative; 0.0
    /// keeps every traced vertex.
    pub simplify_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            simplify_tolerance: 1.0,
        }
    }
}

/// Errors produced by mask validation.
///
/// Geometry over valid inputs never fails: absence of data is an empty
/// collection or `None`, and degenerate arithmetic (zero perimeter,
/// symmetric moments) yields the documented NaN/Inf values rather than
/// an error.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum GeometryError {
    /// The mask contains a value other than 0 or 255.
    #[error("mask contains non-binary value {value} at ({x}, {y})")]
    NonBinaryMask {
        /// The offending pixel value.
        value: u8,
        /// Pixel column.
        x: u32,
        /// Pixel row.
        y: u32,
    },

    /// The mask is too small for boundary tracing.
    #[error("mask is {width}x{height}; boundary tracing needs at least 2x2")]
    MaskTooSmall {
        /// Mask width in pixels.
        width: u32,
        /// Mask height in pixels.
        height: u32,
    },

    /// A negative simplification tolerance was supplied.
    #[error("simplification tolerance must be non-negative, got {0}")]
    NegativeTolerance(f64),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_of_empty_list_is_none() {
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn bounding_box_spans_corner_polygon() {
        let square = [
            Point::new(2, 2),
            Point::new(6, 2),
            Point::new(6, 6),
            Point::new(2, 6),
        ];
        let bbox = BoundingBox::from_points(&square).unwrap();
        assert_eq!(bbox.x, 2);
        assert_eq!(bbox.y, 2);
        assert_eq!(bbox.width, 4);
        assert_eq!(bbox.height, 4);
        assert_eq!(bbox.area(), 16);
    }

    #[test]
    fn point_distance_is_euclidean() {
        let d = Point::new(0, 0).distance(Point::new(3, 4));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn default_tolerance_is_one_pixel() {
        let config = AnalysisConfig::default();
        assert!((config.simplify_tolerance - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn error_round_trips_through_serde() {
        let err = GeometryError::NonBinaryMask {
            value: 17,
            x: 3,
            y: 4,
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: GeometryError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn error_messages_name_the_input() {
        let err = GeometryError::MaskTooSmall {
            width: 1,
            height: 3,
        };
        assert!(err.to_string().contains("1x3"));
    }
}
