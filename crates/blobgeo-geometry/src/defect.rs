//! Convexity defects: the concavities between hull-adjacent contour
//! points.
//!
//! For each pair of hull vertices adjacent in contour order (including
//! the wrap-around pair from the last hull index back to the first),
//! the contour points strictly between them are scanned and the one
//! farthest from the chord connecting the pair becomes the defect's
//! "far" point. Depth is kept in the ×256 fixed-point encoding of the
//! classic defect computation, divided back out, so depths agree with
//! the reference values to 1/256 of a pixel.

use serde::{Deserialize, Serialize};

use crate::contour::perpendicular_distance;
use crate::types::Point;

/// One concavity between two hull-adjacent contour points.
///
/// All three indices reference the owning contour's point array.
/// `end_index` may be numerically less than `start_index`: the defect
/// then wraps past the end of the array back to 0, and index
/// arithmetic over its span is modulo the contour length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    /// Hull vertex opening the concavity.
    pub start_index: usize,
    /// Hull vertex closing the concavity.
    pub end_index: usize,
    /// Contour point of maximum deviation from the chord.
    pub far_index: usize,
    /// Perpendicular distance of the far point from the chord, in
    /// pixels; always ≥ 0, quantized to 1/256.
    pub depth: f64,
    /// Resolved contour point at `start_index`.
    pub start_point: Point,
    /// Resolved contour point at `end_index`.
    pub end_point: Point,
    /// Resolved contour point at `far_index`.
    pub far_point: Point,
}

impl Defect {
    /// Length of the chord between the defect's start and end points.
    #[must_use]
    pub fn gap(&self) -> f64 {
        self.start_point.distance(self.end_point)
    }
}

/// Find every convexity defect of a contour given its ascending hull
/// indices.
///
/// A fully convex contour (hull == contour) yields no defects, as does
/// any contour with fewer than two hull vertices. A defect is emitted
/// only when the maximum deviation is strictly positive.
#[must_use]
pub fn find_defects(points: &[Point], hull: &[usize]) -> Vec<Defect> {
    let len = points.len();
    if len < 3 || hull.len() < 2 {
        return Vec::new();
    }

    let mut defects = Vec::new();
    for (k, &start) in hull.iter().enumerate() {
        let end = hull[(k + 1) % hull.len()];
        let chord_a = points[start];
        let chord_b = points[end];

        let mut max_dist = 0.0;
        let mut far = start;
        let mut i = (start + 1) % len;
        while i != end {
            let d = perpendicular_distance(points[i], chord_a, chord_b);
            if d > max_dist {
                max_dist = d;
                far = i;
            }
            i = (i + 1) % len;
        }

        if max_dist > 0.0 {
            defects.push(Defect {
                start_index: start,
                end_index: end,
                far_index: far,
                depth: fixed_point_depth(max_dist),
                start_point: chord_a,
                end_point: chord_b,
                far_point: points[far],
            });
        }
    }
    defects
}

/// Round a depth through the ×256 integer encoding of the reference
/// defect computation.
fn fixed_point_depth(distance: f64) -> f64 {
    (distance * 256.0).round() / 256.0
}

/// Contour points that remain after "filling" every defect matched by
/// `predicate` back toward its hull chord.
///
/// The contour-index range spanned by each matching defect is removed,
/// endpoints excluded. A wrap-around defect (`end_index <
/// start_index`) deletes its span in two segments: `(start_index,
/// max_index]` and `[0, end_index)`. A predicate matching no defect
/// returns the full original point list unchanged.
#[must_use]
pub fn fill_convex_defects<F>(points: &[Point], defects: &[Defect], predicate: F) -> Vec<Point>
where
    F: Fn(&Defect) -> bool,
{
    let mut keep = vec![true; points.len()];
    for defect in defects.iter().filter(|d| predicate(d)) {
        if defect.end_index >= defect.start_index {
            for flag in &mut keep[defect.start_index + 1..defect.end_index] {
                *flag = false;
            }
        } else {
            for flag in &mut keep[defect.start_index + 1..] {
                *flag = false;
            }
            for flag in &mut keep[..defect.end_index] {
                *flag = false;
            }
        }
    }
    points
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}
