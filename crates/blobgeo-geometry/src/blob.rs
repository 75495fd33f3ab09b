//! Blob extraction: contours zipped with per-region pixel statistics.
//!
//! A [`Blob`] pairs a region's traced boundary with statistics measured
//! on the raster itself (pixel count, pixel-extent bounding box, raw
//! and central second-order moments). The raster is the source of
//! truth for the statistics; the contour only describes the outline,
//! so contour simplification never perturbs a blob's area or moments.

use std::collections::HashMap;

use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::contour;
use crate::types::{AnalysisConfig, Blob, BoundingBox, GeometryError, GrayImage, Moments};

/// Extract every foreground region of a mask as a [`Blob`].
///
/// Regions are 4-connected and returned in raster-scan discovery
/// order, matching the region ids of [`crate::contour::extract`] and
/// [`crate::analysis::ContourAnalysis`] over the same mask.
///
/// # Errors
///
/// Propagates mask and tolerance validation failures from
/// [`contour::extract`].
#[allow(clippy::cast_possible_wrap)]
pub fn blobs_from_mask(
    mask: &GrayImage,
    config: &AnalysisConfig,
) -> Result<Vec<Blob>, GeometryError> {
    let contours = contour::extract(mask, config.simplify_tolerance)?;
    let labels = connected_components(mask, Connectivity::Four, Luma([0u8]));

    // Slots are assigned at first touch in raster order, the same
    // order contour extraction discovers regions in.
    let mut accumulators: Vec<StatsAccumulator> = Vec::new();
    let mut slot_of: HashMap<u32, usize> = HashMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        if label.0[0] == 0 {
            continue;
        }
        let next = accumulators.len();
        let slot = *slot_of.entry(label.0[0]).or_insert(next);
        if slot == next {
            accumulators.push(StatsAccumulator::new());
        }
        accumulators[slot].add(x as i32, y as i32);
    }

    Ok(contours
        .into_iter()
        .zip(accumulators)
        .filter_map(|(points, acc)| {
            acc.finish()
                .map(|(area, bounding_box, moments)| Blob::new(points, bounding_box, area, moments))
        })
        .collect())
}

/// Streaming pixel-statistics accumulator for one region.
pub(crate) struct StatsAccumulator {
    area: u32,
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    sum_x: f64,
    sum_y: f64,
    m20: f64,
    m02: f64,
    m11: f64,
}

impl StatsAccumulator {
    pub(crate) const fn new() -> Self {
        Self {
            area: 0,
            min_x: i32::MAX,
            min_y: i32::MAX,
            max_x: i32::MIN,
            max_y: i32::MIN,
            sum_x: 0.0,
            sum_y: 0.0,
            m20: 0.0,
            m02: 0.0,
            m11: 0.0,
        }
    }

    /// Fold one foreground pixel at absolute coordinates into the
    /// statistics.
    pub(crate) fn add(&mut self, x: i32, y: i32) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        let fx = f64::from(x);
        let fy = f64::from(y);
        self.sum_x += fx;
        self.sum_y += fy;
        self.m20 = fx.mul_add(fx, self.m20);
        self.m02 = fy.mul_add(fy, self.m02);
        self.m11 = fx.mul_add(fy, self.m11);
    }

    /// Finalized statistics, or `None` when no pixel was folded in.
    ///
    /// The bounding box width counts pixels, so it equals the width of
    /// the crack-boundary box traced around the same region.
    pub(crate) fn finish(self) -> Option<(u32, BoundingBox, Moments)> {
        if self.area == 0 {
            return None;
        }
        let n = f64::from(self.area);
        let moments = Moments {
            m20: self.m20,
            m02: self.m02,
            m11: self.m11,
            u20: self.m20 - self.sum_x * self.sum_x / n,
            u02: self.m02 - self.sum_y * self.sum_y / n,
        };
        let bounding_box = BoundingBox {
            x: self.min_x,
            y: self.min_y,
            width: (self.max_x - self.min_x + 1).unsigned_abs(),
            height: (self.max_y - self.min_y + 1).unsigned_abs(),
        };
        Some((self.area, bounding_box, moments))
    }
}
