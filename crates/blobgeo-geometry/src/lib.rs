//! blobgeo-geometry: Geometric shape descriptors for binary masks (sans-IO).
//!
//! Turns a binarized raster mask into per-region boundary geometry and
//! scalar shape metrics through:
//! region labelling -> crack-boundary tracing -> simplification ->
//! convex hull -> convexity defects -> metrics, with a repair module
//! for the reverse direction (polygon rasterization, hole filling,
//! convex-hull reconstruction).
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! `GrayImage` masks and returns structured data. It performs no
//! logging; observability belongs to callers.

pub mod analysis;
pub mod blob;
pub mod contour;
pub mod defect;
pub mod hull;
pub mod metrics;
pub mod repair;
pub mod types;

pub use analysis::{ContourAnalysis, Region};
pub use blob::blobs_from_mask;
pub use defect::Defect;
pub use repair::RasterizedPolygon;
pub use types::{
    AnalysisConfig, Blob, BoundingBox, GeometryError, GrayImage, Moments, Point, PointF,
    RotatedRect,
};
