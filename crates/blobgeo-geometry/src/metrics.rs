//! Scalar shape descriptors: pure functions of a [`Blob`].
//!
//! Metrics are computed on demand and cached nowhere. A blob with an
//! empty contour yields the documented zero values for perimeter and
//! area; ratio metrics built on them are allowed to evaluate to
//! NaN/Inf for degenerate operands (zero perimeter, symmetric moments)
//! and never panic.

use std::f64::consts::PI;

use imageproc::geometry::{arc_length, min_area_rect};
use imageproc::point::Point as ProcPoint;

use crate::hull::convex_hull_indices;
use crate::types::{Blob, Point, PointF, RotatedRect};

fn to_proc_points(points: &[Point]) -> Vec<ProcPoint<i32>> {
    points.iter().map(|p| ProcPoint::new(p.x, p.y)).collect()
}

/// Arc length of the blob's closed contour. 0 if the contour is empty.
#[must_use]
pub fn perimeter(blob: &Blob) -> f64 {
    if blob.contour.is_empty() {
        return 0.0;
    }
    arc_length(&to_proc_points(&blob.contour), true)
}

/// The blob's raw pixel-count area. 0 if the contour is empty.
///
/// The pixel count is the single source of truth; area is never
/// recomputed from contour geometry, so it cannot drift from the mask
/// under aggressive contour simplification.
#[must_use]
pub fn area(blob: &Blob) -> f64 {
    if blob.contour.is_empty() {
        return 0.0;
    }
    f64::from(blob.area)
}

/// `4π·Area / Perimeter²`. 1.0 for a true disc, π/4 for a square.
#[must_use]
pub fn circularity_factor(blob: &Blob) -> f64 {
    4.0 * PI * area(blob) / perimeter(blob).powi(2)
}

/// `1 − |w−h| / (w+h)` over the bounding box. 1.0 for a square box,
/// approaching 0 as the box degenerates to a line.
#[must_use]
pub fn aspect_factor(blob: &Blob) -> f64 {
    let w = f64::from(blob.bounding_box.width);
    let h = f64::from(blob.bounding_box.height);
    1.0 - (w - h).abs() / (w + h)
}

/// Fraction of the bounding box covered by the region.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn extent(blob: &Blob) -> f64 {
    f64::from(blob.area) / blob.bounding_box.area() as f64
}

/// Diameter of the disc with the same area: `sqrt(4·Area/π)`.
#[must_use]
pub fn equivalent_diameter(blob: &Blob) -> f64 {
    (4.0 * f64::from(blob.area) / PI).sqrt()
}

/// Moment-based elongation.
///
/// With `x = M20 + M02` and `y = sqrt(4·M11² + (M20 − M02)²)`, the
/// result is `(x + y) / (x − y)`; Inf when `x = y` (a symmetric blob).
#[must_use]
pub fn elongation_factor(blob: &Blob) -> f64 {
    let m = blob.moments;
    let x = m.m20 + m.m02;
    let y = 4.0f64
        .mul_add(m.m11 * m.m11, (m.m20 - m.m02).powi(2))
        .sqrt();
    (x + y) / (x - y)
}

/// `Area² / (2π·sqrt(U02² + U20²))` over the central moments.
#[must_use]
pub fn compactness(blob: &Blob) -> f64 {
    let m = blob.moments;
    area(blob).powi(2) / (2.0 * PI * m.u02.hypot(m.u20))
}

/// The blob's convex hull vertices, in contour (boundary-walk) order.
///
/// Empty if the contour is empty.
#[must_use]
pub fn convex_hull_points(blob: &Blob) -> Vec<Point> {
    convex_hull_indices(&blob.contour)
        .into_iter()
        .map(|i| blob.contour[i])
        .collect()
}

/// Floating-point variant of [`convex_hull_points`].
#[must_use]
pub fn convex_hull_points_f(blob: &Blob) -> Vec<PointF> {
    convex_hull_indices(&blob.contour)
        .into_iter()
        .map(|i| blob.contour[i].to_f())
        .collect()
}

/// Minimum-area rotated rectangle over the blob's contour points.
///
/// `None` if the contour is empty. Contours with fewer than three
/// points fall back to their axis-aligned bounding box.
#[must_use]
pub fn min_area_rectangle(blob: &Blob) -> Option<RotatedRect> {
    match blob.contour.len() {
        0 => None,
        1 | 2 => {
            let bbox = crate::types::BoundingBox::from_points(&blob.contour)?;
            Some(RotatedRect {
                center: PointF::new(
                    f64::from(bbox.x) + f64::from(bbox.width) / 2.0,
                    f64::from(bbox.y) + f64::from(bbox.height) / 2.0,
                ),
                width: f64::from(bbox.width),
                height: f64::from(bbox.height),
                angle: 0.0,
            })
        }
        _ => {
            let corners = min_area_rect(&to_proc_points(&blob.contour));
            let center = PointF::new(
                corners.iter().map(|c| f64::from(c.x)).sum::<f64>() / 4.0,
                corners.iter().map(|c| f64::from(c.y)).sum::<f64>() / 4.0,
            );
            let edge = |a: ProcPoint<i32>, b: ProcPoint<i32>| {
                f64::from(b.x - a.x).hypot(f64::from(b.y - a.y))
            };
            Some(RotatedRect {
                center,
                width: edge(corners[0], corners[1]),
                height: edge(corners[1], corners[2]),
                angle: f64::from(corners[1].y - corners[0].y)
                    .atan2(f64::from(corners[1].x - corners[0].x))
                    .to_degrees(),
            })
        }
    }
}
