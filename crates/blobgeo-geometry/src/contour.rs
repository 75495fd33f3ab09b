//! Contour extraction: trace region boundaries out of a binary mask.
//!
//! Each external 4-connected foreground region is traced into one
//! ordered, closed polygon over the pixel-corner lattice (crack
//! boundary). Holes inside a region are not traced; only the outer
//! boundary is. Traced polygons are then simplified with a
//! tolerance-ε Ramer-Douglas-Peucker pass that preserves closure.
//!
//! Region ids are assigned in raster-scan discovery order: the region
//! whose first pixel appears first in top-to-bottom, left-to-right
//! order gets id 0, and so on.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::types::{GeometryError, Point};

/// Smallest mask edge length accepted for boundary tracing.
pub const MIN_MASK_DIM: u32 = 2;

/// Walking direction along the crack boundary, in screen coordinates
/// (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    const fn step(self, x: i32, y: i32) -> (i32, i32) {
        match self {
            Self::Up => (x, y - 1),
            Self::Right => (x + 1, y),
            Self::Down => (x, y + 1),
            Self::Left => (x - 1, y),
        }
    }

    /// Clockwise quarter turn (screen orientation).
    const fn turned_right(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }
}

/// Extract the outer contour of every external foreground region.
///
/// Returns one closed polygon per region, indexed by region id. An
/// all-background mask yields an empty vector. A simplified contour may
/// legally have fewer than 3 points; such contours are passed through
/// and degenerate downstream computations are the caller's
/// responsibility to guard.
///
/// # Errors
///
/// Returns [`GeometryError::MaskTooSmall`] for masks under
/// [`MIN_MASK_DIM`] in either dimension,
/// [`GeometryError::NonBinaryMask`] for pixel values other than 0 and
/// 255, and [`GeometryError::NegativeTolerance`] for a tolerance that
/// is negative (or NaN).
pub fn extract(mask: &GrayImage, tolerance: f64) -> Result<Vec<Vec<Point>>, GeometryError> {
    validate_mask(mask)?;
    if tolerance < 0.0 || tolerance.is_nan() {
        return Err(GeometryError::NegativeTolerance(tolerance));
    }

    let labels = connected_components(mask, Connectivity::Four, Luma([0u8]));
    let (width, height) = mask.dimensions();

    let mut discovered: Vec<u32> = Vec::new();
    let mut contours: Vec<Vec<Point>> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let label = labels.get_pixel(x, y).0[0];
            if label == 0 || discovered.contains(&label) {
                continue;
            }
            discovered.push(label);
            let traced = trace_crack_boundary(&labels, x, y, label);
            contours.push(simplify_closed(traced, tolerance));
        }
    }
    Ok(contours)
}

/// Check that a mask is strictly binary and large enough to trace.
pub(crate) fn validate_mask(mask: &GrayImage) -> Result<(), GeometryError> {
    let (width, height) = mask.dimensions();
    if width < MIN_MASK_DIM || height < MIN_MASK_DIM {
        return Err(GeometryError::MaskTooSmall { width, height });
    }
    for (x, y, pixel) in mask.enumerate_pixels() {
        let value = pixel.0[0];
        if value != 0 && value != 255 {
            return Err(GeometryError::NonBinaryMask { value, x, y });
        }
    }
    Ok(())
}

/// Whether the pixel at `(x, y)` carries `label`. Out-of-bounds pixels
/// never do.
fn has_label(labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>, x: i32, y: i32, label: u32) -> bool {
    if x < 0 || y < 0 {
        return false;
    }
    let (x, y) = (x.unsigned_abs(), y.unsigned_abs());
    if x >= labels.width() || y >= labels.height() {
        return false;
    }
    labels.get_pixel(x, y).0[0] == label
}

/// Trace the outer crack boundary of one labelled region.
///
/// `(sx, sy)` is the region's raster-scan first pixel, so its top and
/// left cracks are guaranteed boundary edges and the walk starts at its
/// top-left corner heading right, keeping the region on the right-hand
/// side throughout. Only direction changes are recorded, so collinear
/// runs collapse to their corner vertices.
#[allow(clippy::cast_possible_wrap)]
fn trace_crack_boundary(
    labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>,
    sx: u32,
    sy: u32,
    label: u32,
) -> Vec<Point> {
    let start = (sx as i32, sy as i32);
    let mut direction = Direction::Right;
    let (mut x, mut y) = start;
    let mut points = vec![Point::new(x, y)];

    // Every crack edge is traversed at most once per orientation.
    let budget = 4 * (labels.width() as usize + 1) * (labels.height() as usize + 1);
    for _ in 0..budget {
        (x, y) = direction.step(x, y);
        if (x, y) == start {
            break;
        }

        // Configuration of the four pixels meeting at this corner.
        let nw = has_label(labels, x - 1, y - 1, label);
        let ne = has_label(labels, x, y - 1, label);
        let sw = has_label(labels, x - 1, y, label);
        let se = has_label(labels, x, y, label);
        let code = u8::from(nw) << 3 | u8::from(ne) << 2 | u8::from(sw) << 1 | u8::from(se);

        let next = match code {
            1 | 3 | 11 => Direction::Right,
            2 | 10 | 14 => Direction::Down,
            4 | 5 | 7 => Direction::Up,
            8 | 12 | 13 => Direction::Left,
            // Diagonal pinch: two boundary edges leave this corner.
            // The tight right turn keeps hugging the current region.
            6 | 9 => direction.turned_right(),
            _ => break,
        };
        if next != direction {
            points.push(Point::new(x, y));
            direction = next;
        }
    }
    points
}

/// Ramer-Douglas-Peucker simplification of a closed polygon.
///
/// The polygon is treated as a ring anchored at its first vertex: the
/// first point is always kept and the closing edge back to it takes
/// part in the distance tests, so closure is preserved. A tolerance of
/// 0.0 preserves all points.
#[allow(clippy::float_cmp)]
fn simplify_closed(points: Vec<Point>, tolerance: f64) -> Vec<Point> {
    if points.len() < 3 || tolerance == 0.0 {
        return points;
    }

    let mut ring = points.clone();
    ring.push(points[0]);

    let mut kept = vec![false; ring.len()];
    kept[0] = true;
    kept[ring.len() - 1] = true;
    rdp_recurse(&ring, 0, ring.len() - 1, tolerance, &mut kept);

    points
        .into_iter()
        .zip(kept)
        .filter_map(|(p, keep)| keep.then_some(p))
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;
    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
///
/// When `a` and `b` coincide, falls back to the distance from `p` to
/// `a`.
pub(crate) fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = f64::from(b.x - a.x);
    let dy = f64::from(b.y - a.y);
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(f64::from(a.y - p.y), -(dy * f64::from(a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mask_with(width: u32, height: u32, foreground: &[(u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for &(x, y) in foreground {
            mask.put_pixel(x, y, Luma([255]));
        }
        mask
    }

    fn solid_square(width: u32, height: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask
    }

    #[test]
    fn all_background_mask_yields_no_contours() {
        let contours = extract(&GrayImage::new(10, 10), 1.0).unwrap();
        assert!(contours.is_empty());
    }

    #[test]
    fn square_traces_to_its_four_corners() {
        let mask = solid_square(8, 8, 2, 2, 4);
        let contours = extract(&mask, 1.0).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0],
            vec![
                Point::new(2, 2),
                Point::new(6, 2),
                Point::new(6, 6),
                Point::new(2, 6),
            ]
        );
    }

    #[test]
    fn l_shape_keeps_its_concave_corner() {
        let mask = mask_with(8, 8, &[(2, 2), (2, 3), (3, 3)]);
        let contours = extract(&mask, 0.0).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0],
            vec![
                Point::new(2, 2),
                Point::new(3, 2),
                Point::new(3, 3),
                Point::new(4, 3),
                Point::new(4, 4),
                Point::new(2, 4),
            ]
        );
    }

    #[test]
    fn region_ids_follow_raster_discovery_order() {
        let mut mask = solid_square(16, 16, 9, 2, 3);
        for y in 8..11 {
            for x in 1..4 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let contours = extract(&mask, 1.0).unwrap();
        assert_eq!(contours.len(), 2);
        // The square starting on row 2 is discovered first even though
        // the other sits further left.
        assert_eq!(contours[0][0], Point::new(9, 2));
        assert_eq!(contours[1][0], Point::new(1, 8));
    }

    #[test]
    fn holes_are_not_traced() {
        // 5x5 ring: outer boundary only, the interior hole is skipped.
        let mut mask = solid_square(9, 9, 2, 2, 5);
        for y in 3..6 {
            for x in 3..6 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        let contours = extract(&mask, 1.0).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0],
            vec![
                Point::new(2, 2),
                Point::new(7, 2),
                Point::new(7, 7),
                Point::new(2, 7),
            ]
        );
    }

    #[test]
    fn oversized_tolerance_may_leave_under_three_points() {
        let mask = solid_square(8, 8, 2, 2, 4);
        let contours = extract(&mask, 100.0).unwrap();
        assert_eq!(contours.len(), 1);
        assert!(contours[0].len() < 3);
        assert_eq!(contours[0][0], Point::new(2, 2));
    }

    #[test]
    fn non_binary_mask_is_rejected() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(1, 2, Luma([128]));
        let err = extract(&mask, 1.0).unwrap_err();
        assert_eq!(
            err,
            GeometryError::NonBinaryMask {
                value: 128,
                x: 1,
                y: 2
            }
        );
    }

    #[test]
    fn undersized_mask_is_rejected() {
        let err = extract(&GrayImage::new(1, 5), 1.0).unwrap_err();
        assert_eq!(
            err,
            GeometryError::MaskTooSmall {
                width: 1,
                height: 5
            }
        );
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let mask = GrayImage::new(4, 4);
        let err = extract(&mask, -0.5).unwrap_err();
        assert_eq!(err, GeometryError::NegativeTolerance(-0.5));
    }

    #[test]
    fn nan_tolerance_is_rejected() {
        let mask = GrayImage::new(4, 4);
        assert!(matches!(
            extract(&mask, f64::NAN),
            Err(GeometryError::NegativeTolerance(_))
        ));
    }

    #[test]
    fn diagonally_touching_pixels_are_separate_regions() {
        let mask = mask_with(6, 6, &[(1, 1), (2, 2)]);
        let contours = extract(&mask, 0.0).unwrap();
        assert_eq!(contours.len(), 2);
    }
}
