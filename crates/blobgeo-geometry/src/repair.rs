//! Mask repair and reconstruction: polygon rasterization, hole
//! filling, convex-hull blob synthesis, and border-object removal.
//!
//! Rasterization samples pixel centers against the polygon with an
//! even-odd scanline rule, the exact inverse of the crack-boundary
//! tracer: a traced contour rasterizes back onto the pixels it was
//! traced around. Every rasterization runs a hole-filling pass over
//! the result before it is returned.
//!
//! Two process-wide locks serialize the shared pieces of the
//! hole-filling pipeline: the Laplacian threshold stage runs one call
//! at a time, and the flood-fill work queue is a single reused
//! allocation. Callers never see either lock.

use std::sync::{Mutex, MutexGuard};

use image::Luma;
use imageproc::distance_transform::Norm;
use imageproc::filter::laplacian_filter;
use imageproc::morphology::erode;

use crate::analysis::ContourAnalysis;
use crate::blob::StatsAccumulator;
use crate::contour;
use crate::metrics::convex_hull_points;
use crate::types::{AnalysisConfig, Blob, BoundingBox, GeometryError, GrayImage, Moments, Point};

/// Empty canvas border kept around a rasterized polygon so the
/// background flood can always travel around the foreground.
const GRACE_MARGIN: i32 = 2;

// One threshold conversion runs at a time, process-wide.
static CONVERT_LOCK: Mutex<()> = Mutex::new(());

// Shared work queue for every flood fill in the process.
static FLOOD_SCRATCH: Mutex<Vec<(u32, u32)>> = Mutex::new(Vec::new());

// Poisoning means a panic inside a pipeline stage that never panics on
// valid input; unrecoverable.
#[allow(clippy::expect_used)]
fn convert_lock() -> MutexGuard<'static, ()> {
    CONVERT_LOCK.lock().expect("conversion lock poisoned")
}

#[allow(clippy::expect_used)]
fn flood_scratch() -> MutexGuard<'static, Vec<(u32, u32)>> {
    FLOOD_SCRATCH.lock().expect("flood scratch lock poisoned")
}

/// A polygon rendered onto its own minimal canvas.
///
/// `origin` is the absolute coordinate of the canvas pixel `(0, 0)`;
/// add it to local coordinates to translate back into mask space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterizedPolygon {
    /// Hole-filled binary canvas, foreground 255.
    pub mask: GrayImage,
    /// Absolute position of the canvas origin.
    pub origin: Point,
}

/// Render a closed polygon onto a minimal canvas and fill its holes.
///
/// The canvas covers the polygon's bounding box plus a two-pixel
/// grace ring on every side. An empty point list yields
/// `None`; a degenerate polygon (fewer than three points, or zero
/// enclosed area) yields a canvas with no foreground.
#[must_use]
pub fn rasterize_polygon(points: &[Point]) -> Option<RasterizedPolygon> {
    let bbox = BoundingBox::from_points(points)?;
    let origin = Point::new(bbox.x - GRACE_MARGIN, bbox.y - GRACE_MARGIN);
    let width = bbox.width + 2 * GRACE_MARGIN.unsigned_abs();
    let height = bbox.height + 2 * GRACE_MARGIN.unsigned_abs();
    let mut canvas = GrayImage::new(width, height);
    fill_polygon_mut(&mut canvas, points, origin);
    Some(RasterizedPolygon {
        mask: fill_holes(&canvas),
        origin,
    })
}

/// Fill the enclosed holes of a binary mask.
///
/// Boundary pixels are detected with a Laplacian filter, the
/// background is flood-filled from the top-left corner, and everything
/// the flood cannot reach becomes foreground. The one-pixel boundary
/// band picked up along the way is shaved back off with an L1 erosion,
/// so a hole-free mask whose foreground stays off the image border
/// round-trips unchanged.
#[must_use]
pub fn fill_holes(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return mask.clone();
    }
    let lap = laplacian_filter(mask);
    let edges = {
        let _serial = convert_lock();
        GrayImage::from_fn(width, height, |x, y| {
            Luma([u8::from(lap.get_pixel(x, y).0[0] != 0) * 255])
        })
    };
    let background = background_from_corner(&edges);
    let filled = GrayImage::from_fn(width, height, |x, y| {
        if background[y as usize * width as usize + x as usize] {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    erode(&filled, Norm::L1, 1)
}

/// Reconstruct a blob as its own convex hull.
///
/// The hull polygon is rasterized, hole-filled, and re-traced; the
/// returned blob carries the traced outline in the input blob's
/// coordinates and statistics measured on the reconstructed raster.
/// `None` when the input contour is too degenerate to enclose any
/// pixel.
#[must_use]
pub fn convex_hull_blob(blob: &Blob) -> Option<Blob> {
    let hull = convex_hull_points(blob);
    let raster = rasterize_polygon(&hull)?;
    let traced = contour::extract(&raster.mask, 0.0).ok()?;
    let local = traced.first()?;
    let points = local
        .iter()
        .map(|p| Point::new(p.x + raster.origin.x, p.y + raster.origin.y))
        .collect();
    let (area, bounding_box, moments) = region_stats(&raster.mask, raster.origin)?;
    Some(Blob::new(points, bounding_box, area, moments))
}

/// Replace every region of a mask with its filled convex hull.
///
/// # Errors
///
/// Propagates mask and tolerance validation failures from the
/// underlying contour extraction.
pub fn fill_convex_hulls(
    mask: &GrayImage,
    config: &AnalysisConfig,
) -> Result<GrayImage, GeometryError> {
    let analysis = ContourAnalysis::from_mask(mask, config)?;
    let mut out = mask.clone();
    for region in analysis.regions() {
        fill_polygon_mut(&mut out, &region.hull_points(), Point::new(0, 0));
    }
    Ok(out)
}

/// Erase every foreground region touching the image border.
#[must_use]
pub fn remove_border_objects(mask: &GrayImage) -> GrayImage {
    let mut out = mask.clone();
    let (width, height) = out.dimensions();
    if width == 0 || height == 0 {
        return out;
    }
    let mut queue = flood_scratch();
    queue.clear();
    let mut seed = |out: &mut GrayImage, queue: &mut Vec<(u32, u32)>, x: u32, y: u32| {
        if out.get_pixel(x, y).0[0] != 0 {
            out.put_pixel(x, y, Luma([0]));
            queue.push((x, y));
        }
    };
    for x in 0..width {
        seed(&mut out, &mut queue, x, 0);
        seed(&mut out, &mut queue, x, height - 1);
    }
    for y in 0..height {
        seed(&mut out, &mut queue, 0, y);
        seed(&mut out, &mut queue, width - 1, y);
    }
    while let Some((x, y)) = queue.pop() {
        for (nx, ny) in neighbors4(x, y, width, height) {
            if out.get_pixel(nx, ny).0[0] != 0 {
                out.put_pixel(nx, ny, Luma([0]));
                queue.push((nx, ny));
            }
        }
    }
    out
}

/// Flood the zero pixels of `edges` reachable from `(0, 0)`,
/// 4-connected. Returns one flag per pixel in row-major order.
fn background_from_corner(edges: &GrayImage) -> Vec<bool> {
    let (width, height) = edges.dimensions();
    let mut background = vec![false; width as usize * height as usize];
    if edges.get_pixel(0, 0).0[0] != 0 {
        return background;
    }
    let mut queue = flood_scratch();
    queue.clear();
    background[0] = true;
    queue.push((0, 0));
    while let Some((x, y)) = queue.pop() {
        for (nx, ny) in neighbors4(x, y, width, height) {
            let idx = ny as usize * width as usize + nx as usize;
            if !background[idx] && edges.get_pixel(nx, ny).0[0] == 0 {
                background[idx] = true;
                queue.push((nx, ny));
            }
        }
    }
    background
}

fn neighbors4(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    [
        (x.wrapping_sub(1), y),
        (x + 1, y),
        (x, y.wrapping_sub(1)),
        (x, y + 1),
    ]
    .into_iter()
    .filter(move |&(nx, ny)| nx < width && ny < height)
}

/// Paint the interior of a closed polygon, even-odd rule, sampling
/// pixel centers. `origin` maps canvas pixel `(0, 0)` to absolute
/// coordinates.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn fill_polygon_mut(canvas: &mut GrayImage, polygon: &[Point], origin: Point) {
    if polygon.len() < 3 {
        return;
    }
    let (width, height) = canvas.dimensions();
    let mut crossings: Vec<f64> = Vec::new();
    for row in 0..height {
        let sample_y = f64::from(origin.y) + f64::from(row) + 0.5;
        crossings.clear();
        for (k, &a) in polygon.iter().enumerate() {
            let b = polygon[(k + 1) % polygon.len()];
            let (ay, by) = (f64::from(a.y), f64::from(b.y));
            if (ay > sample_y) == (by > sample_y) {
                continue;
            }
            let t = (sample_y - ay) / (by - ay);
            crossings.push(f64::from(b.x - a.x).mul_add(t, f64::from(a.x)));
        }
        crossings.sort_by(|u, v| u.partial_cmp(v).unwrap_or(std::cmp::Ordering::Equal));
        for pair in crossings.chunks_exact(2) {
            // Pixel centers in [pair[0], pair[1]).
            let lo = pair[0] - f64::from(origin.x) - 0.5;
            let hi = pair[1] - f64::from(origin.x) - 0.5;
            let first = lo.ceil().clamp(0.0, f64::from(width)) as u32;
            let end = hi.ceil().clamp(0.0, f64::from(width)) as u32;
            for col in first..end {
                canvas.put_pixel(col, row, Luma([255]));
            }
        }
    }
}

/// Statistics of the whole foreground of a single-region mask,
/// translated by `origin` into absolute coordinates.
#[allow(clippy::cast_possible_wrap)]
fn region_stats(mask: &GrayImage, origin: Point) -> Option<(u32, BoundingBox, Moments)> {
    let mut acc = StatsAccumulator::new();
    for (x, y, px) in mask.enumerate_pixels() {
        if px.0[0] != 0 {
            acc.add(origin.x + x as i32, origin.y + y as i32);
        }
    }
    acc.finish()
}
