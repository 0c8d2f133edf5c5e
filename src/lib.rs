//! Library for reading and writing VOLA volumetric occupancy data.
//!
//! A `.vol` file stores a fixed-depth 64-ary tree: every node is one
//! 64-bit word whose bits mark which of its 4x4x4 sub-cells are
//! occupied, and occupied children are laid out contiguously at the
//! next level. Sparse point clouds compress aggressively while still
//! supporting random voxel lookup and streaming decode.
//!
//! Usage example:
//! ```no_run
//! use vola_rs::{Bounds, Mode, VolaFile, VolaTree};
//!
//! fn main() -> vola_rs::Result<()> {
//!     let bounds = Bounds::new(0., 0., 0., 16., 16., 16.);
//!     let mut tree = VolaTree::new(2, bounds, 2000, Mode::Sparse, 0)?;
//!     tree.cubify(&[[1.0, 2.0, 3.0], [15.5, 0.5, 9.0]], None)?;
//!     tree.write("cloud.vol")?;
//!
//!     let decoded = VolaFile::from_path("cloud.vol")?;
//!     for voxel in decoded.voxels() {
//!         println!("{}, {}, {}", voxel.x, voxel.y, voxel.z);
//!     }
//!     Ok(())
//! }
//! ```

pub mod bits;
mod bounds;
pub mod crs;
mod error;
mod header;
pub mod index;
pub mod path;
mod points;
pub mod quant;
mod reader;
mod tree;
pub mod views;
mod writer;

pub use bounds::Bounds;
pub use crs::Reprojector;
pub use error::{Error, Result};
pub use header::{Mode, VolaHeader};
pub use points::{PointCloud, PointProducer};
pub use reader::{VolaFile, Voxel, VoxelIter};
pub use tree::VolaTree;

/// Size of the fixed file header in bytes.
pub const HEADER_SIZE: u32 = 80;

/// On-disk format version.
pub const FORMAT_VERSION: u16 = 1;

/// EPSG field value marking an unset coordinate reference system.
pub const CRS_UNSET: u32 = 2000;

/// Deepest supported tree (1024 voxels per side).
pub const MAX_DEPTH: u8 = 5;

/// Most payload bytes a voxel word can pack.
pub const MAX_PAYLOAD_BYTES: u32 = 8;
