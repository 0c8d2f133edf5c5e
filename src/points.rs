//! The contract format adapters present to the tree builder.
//!
//! Parsers for LAS, PLY, STL and friends live outside this crate; all
//! the builder needs from them is a bounding box, the points and an
//! optional byte payload per point.

use crate::bounds::Bounds;
use crate::CRS_UNSET;

/// A parsed point cloud, ready to cubify.
pub struct PointCloud {
    /// Bounding box of the points in their CRS
    pub bounds: Bounds,
    /// Point positions
    pub points: Vec<[f64; 3]>,
    /// Optional per-point payload rows, at most 8 bytes each
    pub payloads: Option<Vec<Vec<u8>>>,
    /// EPSG code, [CRS_UNSET] when unknown
    pub crs: u32,
}

impl PointCloud {
    /// A cloud with its bbox computed from the points and no CRS.
    pub fn from_points(points: Vec<[f64; 3]>) -> Self {
        PointCloud {
            bounds: Bounds::from_points(&points),
            points,
            payloads: None,
            crs: CRS_UNSET,
        }
    }

    pub fn with_payloads(mut self, payloads: Vec<Vec<u8>>) -> Self {
        self.payloads = Some(payloads);
        self
    }

    pub fn with_crs(mut self, crs: u32) -> Self {
        self.crs = crs;
        self
    }
}

/// A source of point clouds, one per input file.
pub trait PointProducer {
    fn produce(self) -> crate::Result<PointCloud>;
}
