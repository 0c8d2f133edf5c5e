//! Building a VOLA tree from points.

use std::collections::BTreeMap;
use std::path::Path;

use crate::bounds::Bounds;
use crate::crs::Reprojector;
use crate::header::{Mode, VolaHeader};
use crate::points::PointCloud;
use crate::{bits, path, quant};
use crate::{MAX_DEPTH, MAX_PAYLOAD_BYTES};

/// Scratch state for one level, keyed by word offset so a sparse build
/// allocates proportionally to the number of occupied voxels. The map
/// iterates in ascending offset order, which is the serialised order.
#[derive(Default)]
pub(crate) struct Level {
    pub(crate) occ: BTreeMap<usize, u64>,
    pub(crate) pay: BTreeMap<usize, u64>,
}

/// A VOLA tree under construction.
///
/// Created with [new], filled through [cubify] or [insert], then
/// serialised once with [write] and discarded.
///
/// [new]: Self::new
/// [cubify]: Self::cubify
/// [insert]: Self::insert
/// [write]: Self::write
pub struct VolaTree {
    mode: Mode,
    depth: u8,
    nbits: u32,
    crs: u32,
    bounds: Bounds,
    side: u32,
    extent: f64,
    pub(crate) levels: Vec<Level>,
}

impl VolaTree {
    /// Creates an empty tree.
    ///
    /// `depth` levels give a cube of `4^depth` voxels per side. The cube
    /// is scaled by the longest axis of `bounds`. `nbits` payload bytes
    /// are stored per voxel, 0 for occupancy only.
    pub fn new(depth: u8, bounds: Bounds, crs: u32, mode: Mode, nbits: u32) -> crate::Result<Self> {
        if depth < 1 || depth > MAX_DEPTH {
            return Err(crate::Error::InvalidDepth(depth));
        }
        if nbits > MAX_PAYLOAD_BYTES {
            return Err(crate::Error::InvalidPayloadWidth(nbits));
        }

        let levels = (0..depth).map(|_| Level::default()).collect();

        Ok(VolaTree {
            mode,
            depth,
            nbits,
            crs,
            bounds,
            side: path::grid_side(depth),
            extent: bounds.longest_side(),
            levels,
        })
    }

    /// Builds a tree straight from a producer's cloud, deriving the
    /// payload width from the widest payload row.
    pub fn from_cloud(cloud: &PointCloud, depth: u8, mode: Mode) -> crate::Result<Self> {
        let nbits = cloud
            .payloads
            .as_ref()
            .and_then(|rows| rows.iter().map(Vec::len).max())
            .unwrap_or(0) as u32;

        let mut tree = VolaTree::new(depth, cloud.bounds, cloud.crs, mode, nbits)?;
        tree.cubify(&cloud.points, cloud.payloads.as_deref())?;
        Ok(tree)
    }

    /// Quantises a point cloud into voxels and inserts them.
    ///
    /// Each point is normalised per axis by `(p - min) / extent`, clamped
    /// to `[0, 1]`, scaled to `[0, side - 1]` and rounded half away from
    /// zero. Points landing in the same voxel collapse; the payload of
    /// the last one in array order wins. Insertion happens in sorted
    /// coordinate order, so the output bytes do not depend on input
    /// order. Without `payloads`, a tree with `nbits > 0` stores
    /// `nbits` bytes of 255 per voxel.
    pub fn cubify(&mut self, points: &[[f64; 3]], payloads: Option<&[Vec<u8>]>) -> crate::Result<()> {
        if let Some(rows) = payloads {
            if rows.len() != points.len() {
                return Err(crate::Error::PayloadCountMismatch {
                    points: points.len(),
                    payloads: rows.len(),
                });
            }
        }

        let mut cubes: BTreeMap<(u32, u32, u32), usize> = BTreeMap::new();
        for (idx, p) in points.iter().enumerate() {
            cubes.insert(self.quantise(p), idx);
        }
        log::info!("cubified {} points into {} voxels", points.len(), cubes.len());

        let default_payload = vec![255u8; self.nbits as usize];
        for (coord, idx) in cubes {
            let payload = match payloads {
                Some(rows) => rows[idx].as_slice(),
                None => default_payload.as_slice(),
            };
            self.insert(coord, payload)?;
        }
        Ok(())
    }

    /// Sets the occupancy bits along `coord`'s path and stores the packed
    /// payload word at the terminal level.
    pub fn insert(&mut self, coord: (u32, u32, u32), payload: &[u8]) -> crate::Result<()> {
        let (x, y, z) = coord;
        if x >= self.side || y >= self.side || z >= self.side {
            return Err(crate::Error::CoordOutOfGrid(x, y, z, self.side));
        }
        if payload.len() > self.nbits as usize {
            return Err(crate::Error::PayloadTooWide {
                len: payload.len(),
                nbits: self.nbits,
            });
        }

        let word = pack_payload(payload);
        let digits = path::sparse_path(coord, self.depth);

        for d in 0..self.depth as usize {
            let (off, bit) = match self.mode {
                Mode::Sparse => (path::prefix_offset(&digits[..d]), digits[d]),
                Mode::Dense => path::dense_offset(coord, d as u8, self.depth),
            };
            let level = &mut self.levels[d];
            let occ = level.occ.entry(off).or_insert(0);
            *occ = bits::set(*occ, bit);

            if self.nbits > 0 && d == self.depth as usize - 1 {
                level.pay.insert(off, word);
            }
        }
        Ok(())
    }

    /// Serialises the tree to `path`, leaving lat/lon at zero.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        crate::writer::write_tree(self, path.as_ref(), None)
    }

    /// Serialises the tree to `path`, reprojecting the bbox centroid to
    /// WGS84 through `reprojector` for the header's lat/lon.
    pub fn write_with<P: AsRef<Path>>(
        &self,
        path: P,
        reprojector: &dyn Reprojector,
    ) -> crate::Result<()> {
        crate::writer::write_tree(self, path.as_ref(), Some(reprojector))
    }

    /// True while no voxel has been inserted.
    pub fn is_empty(&self) -> bool {
        self.levels[0].occ.get(&0).copied().unwrap_or(0) == 0
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn nbits(&self) -> u32 {
        self.nbits
    }

    pub fn crs(&self) -> u32 {
        self.crs
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Voxel grid side length (4^depth).
    pub fn side(&self) -> u32 {
        self.side
    }

    pub(crate) fn header_with(&self, lat: f64, lon: f64) -> VolaHeader {
        VolaHeader {
            mode: self.mode,
            depth: self.depth,
            nbits: self.nbits,
            crs: self.crs,
            lat,
            lon,
            bounds: self.bounds,
        }
    }

    fn quantise(&self, p: &[f64; 3]) -> (u32, u32, u32) {
        let top = (self.side - 1) as f64;
        let lo = [self.bounds.min_x, self.bounds.min_y, self.bounds.min_z];
        let mut v = [0u32; 3];
        for axis in 0..3 {
            let normed = quant::normalize(p[axis], lo[axis], lo[axis] + self.extent);
            v[axis] = (normed * top).round() as u32;
        }
        (v[0], v[1], v[2])
    }
}

/// Packs payload bytes into a word, byte `i` at bits `[8i, 8i+8)`.
fn pack_payload(payload: &[u8]) -> u64 {
    payload
        .iter()
        .enumerate()
        .fold(0u64, |word, (i, &byte)| word | (byte as u64) << (8 * i))
}
