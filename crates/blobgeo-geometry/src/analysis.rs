//! One-pass contour analysis of a binary mask.
//!
//! [`ContourAnalysis::from_mask`] extracts every external region
//! boundary, builds its convex hull, and scans its convexity defects
//! in a single pass. The results live in a contiguous arena indexed by
//! region id (raster-scan discovery order) and are immutable from then
//! on.

use crate::contour;
use crate::defect::{self, Defect};
use crate::hull::convex_hull_indices;
use crate::types::{AnalysisConfig, GeometryError, GrayImage, Point};

/// Contour, hull, and defects of one region, co-located in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    contour: Vec<Point>,
    hull: Vec<usize>,
    defects: Vec<Defect>,
}

impl Region {
    /// The region's closed boundary polygon.
    #[must_use]
    pub fn contour(&self) -> &[Point] {
        &self.contour
    }

    /// Ascending contour indices of the convex hull vertices.
    #[must_use]
    pub fn hull(&self) -> &[usize] {
        &self.hull
    }

    /// Convexity defects, one per concave hull gap.
    #[must_use]
    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    /// The hull vertices resolved to points, in boundary-walk order.
    #[must_use]
    pub fn hull_points(&self) -> Vec<Point> {
        self.hull.iter().map(|&i| self.contour[i]).collect()
    }
}

/// Contours, convex hulls, and convexity defects of every external
/// region in a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourAnalysis {
    regions: Vec<Region>,
}

impl ContourAnalysis {
    /// Analyze a white-foreground, black-background mask.
    ///
    /// The mask is read, never written; analysis works on the traced
    /// geometry alone.
    ///
    /// # Errors
    ///
    /// Propagates mask and tolerance validation failures from
    /// [`contour::extract`].
    pub fn from_mask(mask: &GrayImage, config: &AnalysisConfig) -> Result<Self, GeometryError> {
        let regions = contour::extract(mask, config.simplify_tolerance)?
            .into_iter()
            .map(|contour| {
                let hull = convex_hull_indices(&contour);
                let defects = defect::find_defects(&contour, &hull);
                Region {
                    contour,
                    hull,
                    defects,
                }
            })
            .collect();
        Ok(Self { regions })
    }

    /// Number of detected regions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the mask contained no foreground regions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// All regions, indexed by region id.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// The contour of region `id`, if it exists.
    #[must_use]
    pub fn contour(&self, id: usize) -> Option<&[Point]> {
        self.regions.get(id).map(Region::contour)
    }

    /// The hull indices of region `id`, if it exists.
    #[must_use]
    pub fn hull(&self, id: usize) -> Option<&[usize]> {
        self.regions.get(id).map(Region::hull)
    }

    /// The defects of region `id`, if it exists.
    #[must_use]
    pub fn defects(&self, id: usize) -> Option<&[Defect]> {
        self.regions.get(id).map(Region::defects)
    }

    /// The hull points of region `id`, if it exists.
    #[must_use]
    pub fn hull_points(&self, id: usize) -> Option<Vec<Point>> {
        self.regions.get(id).map(Region::hull_points)
    }

    /// Contour points of region `id` that remain after filling every
    /// defect matched by `predicate` back toward its hull chord.
    ///
    /// Returns `None` for an unknown region id. See
    /// [`defect::fill_convex_defects`] for the removal semantics.
    #[must_use]
    pub fn fill_convex_defects<F>(&self, id: usize, predicate: F) -> Option<Vec<Point>>
    where
        F: Fn(&Defect) -> bool,
    {
        let region = self.regions.get(id)?;
        Some(defect::fill_convex_defects(
            &region.contour,
            &region.defects,
            predicate,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Luma;

    fn solid_rect(mask: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    /// 8-wide U: two 2-wide prongs joined by a 2-tall base.
    fn u_shape_mask() -> GrayImage {
        let mut mask = GrayImage::new(14, 14);
        solid_rect(&mut mask, 2, 2, 2, 8);
        solid_rect(&mut mask, 8, 2, 2, 8);
        solid_rect(&mut mask, 2, 8, 8, 2);
        mask
    }

    #[test]
    fn square_mask_is_fully_convex() {
        let mut mask = GrayImage::new(8, 8);
        solid_rect(&mut mask, 2, 2, 4, 4);
        let analysis = ContourAnalysis::from_mask(&mask, &AnalysisConfig::default()).unwrap();
        assert_eq!(analysis.len(), 1);
        assert_eq!(analysis.hull(0).unwrap(), &[0, 1, 2, 3]);
        assert!(analysis.defects(0).unwrap().is_empty());
    }

    #[test]
    fn u_shape_has_a_deep_defect() {
        let analysis =
            ContourAnalysis::from_mask(&u_shape_mask(), &AnalysisConfig::default()).unwrap();
        assert_eq!(analysis.len(), 1);
        let defects = analysis.defects(0).unwrap();
        assert!(!defects.is_empty());
        let deepest = defects
            .iter()
            .map(|d| d.depth)
            .fold(0.0f64, f64::max);
        // The notch is 6 pixels deep.
        assert!(deepest >= 5.0, "deepest defect only {deepest}");
    }

    #[test]
    fn hull_and_defect_invariants_hold_for_every_region() {
        let mut mask = GrayImage::new(24, 24);
        solid_rect(&mut mask, 1, 1, 5, 3);
        solid_rect(&mut mask, 10, 2, 3, 9);
        solid_rect(&mut mask, 12, 2, 8, 3);
        solid_rect(&mut mask, 4, 15, 9, 6);
        solid_rect(&mut mask, 6, 12, 2, 4);
        let analysis = ContourAnalysis::from_mask(&mask, &AnalysisConfig::default()).unwrap();
        assert!(!analysis.is_empty());
        for region in analysis.regions() {
            let len = region.contour().len();
            for pair in region.hull().windows(2) {
                assert!(pair[0] < pair[1]);
            }
            for &i in region.hull() {
                assert!(i < len);
            }
            for defect in region.defects() {
                assert!(defect.start_index < len);
                assert!(defect.end_index < len);
                assert!(defect.far_index < len);
                assert!(defect.depth >= 0.0);
            }
        }
    }

    #[test]
    fn filling_all_defects_recovers_a_convex_outline() {
        let analysis =
            ContourAnalysis::from_mask(&u_shape_mask(), &AnalysisConfig::default()).unwrap();
        let filled = analysis.fill_convex_defects(0, |_| true).unwrap();
        let hull_points = analysis.hull_points(0).unwrap();
        // Everything that survives lies on or adjacent to the hull.
        for p in &hull_points {
            assert!(filled.contains(p));
        }
        assert!(filled.len() < analysis.contour(0).unwrap().len());
    }

    #[test]
    fn unknown_region_id_yields_none() {
        let analysis =
            ContourAnalysis::from_mask(&GrayImage::new(4, 4), &AnalysisConfig::default()).unwrap();
        assert!(analysis.contour(0).is_none());
        assert!(analysis.hull(0).is_none());
        assert!(analysis.defects(0).is_none());
        assert!(analysis.fill_convex_defects(0, |_| true).is_none());
    }

    #[test]
    fn invalid_mask_propagates_the_error() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, Luma([7]));
        let err = ContourAnalysis::from_mask(&mask, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, GeometryError::NonBinaryMask { value: 7, .. }));
    }

    #[test]
    fn hull_points_resolve_indices_in_contour_order() {
        let analysis =
            ContourAnalysis::from_mask(&u_shape_mask(), &AnalysisConfig::default()).unwrap();
        let region = &analysis.regions()[0];
        let resolved = region.hull_points();
        assert_eq!(resolved.len(), region.hull().len());
        for (&i, p) in region.hull().iter().zip(&resolved) {
            assert_eq!(region.contour()[i], *p);
        }
    }
}
