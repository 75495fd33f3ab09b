//! Convex hull of a contour, reported as contour indices.
//!
//! The hull is computed with Andrew's monotone chain and then re-sorted
//! ascending by contour index, deliberately discarding geometric
//! winding order: downstream defect analysis walks hull vertices in
//! contour order to find the gaps between them, and since a contour is
//! a closed boundary walk, ascending contour indices already visit the
//! hull vertices in polygon order.

use crate::types::Point;

/// Indices of the contour vertices lying on the convex hull, strictly
/// ascending.
///
/// Accepts any non-empty point list; a single point yields `[0]` and a
/// collinear set yields its two extreme indices. An empty slice yields
/// an empty hull.
#[must_use]
pub fn convex_hull_indices(points: &[Point]) -> Vec<usize> {
    if points.len() <= 1 {
        return (0..points.len()).collect();
    }

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_unstable_by_key(|&i| (points[i].x, points[i].y, i));
    order.dedup_by_key(|&mut i| points[i]);

    if order.len() == 1 {
        return order;
    }

    // Lower hull, then upper hull; popping on non-left turns drops
    // collinear and interior vertices.
    let mut hull: Vec<usize> = Vec::with_capacity(order.len() + 1);
    for &i in &order {
        while hull.len() >= 2
            && cross(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= 0
        {
            hull.pop();
        }
        hull.push(i);
    }
    let lower_len = hull.len() + 1;
    for &i in order.iter().rev() {
        while hull.len() >= lower_len
            && cross(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= 0
        {
            hull.pop();
        }
        hull.push(i);
    }
    hull.pop();

    hull.sort_unstable();
    hull.dedup();
    hull
}

/// Z component of the cross product (b − a) × (c − a).
fn cross(a: Point, b: Point, c: Point) -> i64 {
    let abx = i64::from(b.x - a.x);
    let aby = i64::from(b.y - a.y);
    let acx = i64::from(c.x - a.x);
    let acy = i64::from(c.y - a.y);
    abx * acy - aby * acx
}
