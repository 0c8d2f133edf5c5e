//! Decoding `.vol` files and traversing the decoded tree.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::bits;
use crate::header::{Mode, VolaHeader};
use crate::path::{self, dense_level_len};
use crate::{CRS_UNSET, MAX_DEPTH};

/// A decoded, immutable VOLA tree.
pub struct VolaFile {
    header: VolaHeader,
    /// Occupancy words per level, in serialised order
    pub(crate) levels: Vec<Vec<u64>>,
    /// Payload words per level, empty when `nbits == 0`
    payload: Vec<Vec<u64>>,
}

impl VolaFile {
    /// Opens and fully decodes a file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let mut src = BufReader::new(File::open(path)?);
        VolaFile::read_from(&mut src)
    }

    /// Decodes a tree from a `Read`.
    ///
    /// Level sizes are derived while reading: level 0 is one word, and
    /// each further level holds one word per set parent bit (sparse) or
    /// `64^d` words (dense).
    pub fn read_from<R: Read>(mut read: R) -> crate::Result<Self> {
        let header = VolaHeader::read_from(&mut read)?;

        let depth = header.depth;
        let mut levels = Vec::with_capacity(depth as usize);
        let mut payload = Vec::new();
        let mut expected = 1usize;

        for d in 0..depth {
            let occ = read_words(&mut read, expected, d)?;
            if header.nbits > 0 {
                payload.push(read_words(&mut read, expected, d)?);
            }
            expected = match header.mode {
                Mode::Sparse => occ.iter().map(|w| bits::popcount(*w) as usize).sum(),
                Mode::Dense => dense_level_len(d + 1),
            };
            levels.push(occ);
        }

        Ok(VolaFile {
            header,
            levels,
            payload,
        })
    }

    pub fn header(&self) -> &VolaHeader {
        &self.header
    }

    /// Number of occupied voxels.
    pub fn voxel_count(&self) -> usize {
        self.levels[self.header.depth as usize - 1]
            .iter()
            .map(|w| bits::popcount(*w) as usize)
            .sum()
    }

    /// Looks a voxel up by coordinate.
    ///
    /// Returns the terminal payload word when the voxel is occupied
    /// (0 for occupancy-only files) and `None` when it is not.
    pub fn get_voxel(&self, coord: (u32, u32, u32)) -> crate::Result<Option<u64>> {
        let side = self.header.side();
        let (x, y, z) = coord;
        if x >= side || y >= side || z >= side {
            return Err(crate::Error::CoordOutOfGrid(x, y, z, side));
        }

        Ok(match self.header.mode {
            Mode::Sparse => self.get_sparse(coord),
            Mode::Dense => self.get_dense(coord),
        })
    }

    /// Whether the voxel at `coord` is occupied.
    pub fn contains(&self, coord: (u32, u32, u32)) -> crate::Result<bool> {
        Ok(self.get_voxel(coord)?.is_some())
    }

    fn get_sparse(&self, coord: (u32, u32, u32)) -> Option<u64> {
        let depth = self.header.depth as usize;
        let digits = path::sparse_path(coord, self.header.depth);
        let mut word_idx = 0;

        for d in 0..depth - 1 {
            let word = self.levels[d][word_idx];
            if bits::read(word, digits[d]) == 0 {
                return None;
            }
            // child offset: children of every earlier parent word at this
            // level, plus this word's children below our bit
            let earlier: u32 = self.levels[d][..word_idx]
                .iter()
                .map(|w| bits::popcount(*w))
                .sum();
            let below = word & ((1u64 << digits[d]) - 1);
            word_idx = (earlier + bits::popcount(below)) as usize;
        }

        let word = self.levels[depth - 1][word_idx];
        if bits::read(word, digits[depth - 1]) == 0 {
            return None;
        }
        Some(self.terminal_payload(word_idx))
    }

    fn get_dense(&self, coord: (u32, u32, u32)) -> Option<u64> {
        let depth = self.header.depth;
        for d in 0..depth - 1 {
            let (off, bit) = path::dense_offset(coord, d, depth);
            if bits::read(self.levels[d as usize][off], bit) == 0 {
                return None;
            }
        }

        let (off, bit) = path::dense_offset(coord, depth - 1, depth);
        if bits::read(self.levels[depth as usize - 1][off], bit) == 0 {
            return None;
        }
        Some(self.terminal_payload(off))
    }

    fn terminal_payload(&self, word_idx: usize) -> u64 {
        self.payload
            .last()
            .map(|words| words[word_idx])
            .unwrap_or(0)
    }

    /// Depth-first iterator over the occupied voxels.
    pub fn voxels(&self) -> VoxelIter<'_> {
        let iter = match self.header.mode {
            Mode::Sparse => Walk::Sparse(SparseWalk::new(self)),
            Mode::Dense => Walk::Dense(DenseWalk::new(self)),
        };
        VoxelIter { file: self, iter }
    }

    /// Voxel positions mapped back into the source CRS:
    /// `(v / side) * extent + bbox.min` per axis. With an unset CRS the
    /// voxel coordinates are returned unchanged.
    pub fn crs_coords(&self) -> Vec<[f64; 3]> {
        if self.header.crs == CRS_UNSET {
            log::info!("coordinate system was not set, returning voxel coordinates");
            return self
                .voxels()
                .map(|v| [v.x as f64, v.y as f64, v.z as f64])
                .collect();
        }

        let side = self.header.side() as f64;
        let extent = self.header.extent();
        let min = [
            self.header.bounds.min_x,
            self.header.bounds.min_y,
            self.header.bounds.min_z,
        ];
        self.voxels()
            .map(|v| {
                let scale = |coord: u32, axis: usize| (coord as f64 / side) * extent + min[axis];
                [scale(v.x, 0), scale(v.y, 1), scale(v.z, 2)]
            })
            .collect()
    }
}

fn read_words<R: Read>(read: &mut R, count: usize, level: u8) -> crate::Result<Vec<u64>> {
    let mut words = vec![0u64; count];
    read.read_u64_into::<LittleEndian>(&mut words)
        .map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => crate::Error::Truncated(level),
            _ => crate::Error::Io(e),
        })?;
    Ok(words)
}

/// An occupied voxel yielded by [VoxelIter].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Voxel {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    /// Terminal payload word, `None` for occupancy-only files.
    ///
    /// The word is stored per terminal occupancy word, so the up to 64
    /// sibling voxels of one word share it; the last insert wins.
    pub payload: Option<u64>,
}

/// Depth-first voxel iterator, ascending bit order at every level.
pub struct VoxelIter<'a> {
    file: &'a VolaFile,
    iter: Walk,
}

enum Walk {
    Sparse(SparseWalk),
    Dense(DenseWalk),
}

impl Iterator for VoxelIter<'_> {
    type Item = Voxel;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.iter {
            Walk::Sparse(walk) => walk.next(self.file),
            Walk::Dense(walk) => walk.next(self.file),
        }
    }
}

struct Frame {
    level: usize,
    word_idx: usize,
    bit_list: Vec<u32>,
    pos: usize,
}

/// Walk state for the sparse layout: a frame per level plus a cursor
/// per level counting consumed child words, which is what locates the
/// next child inside the flat level arrays.
struct SparseWalk {
    stack: Vec<Frame>,
    cursors: [usize; MAX_DEPTH as usize],
    digits: [u32; MAX_DEPTH as usize],
}

impl SparseWalk {
    fn new(file: &VolaFile) -> Self {
        SparseWalk {
            stack: vec![Frame {
                level: 0,
                word_idx: 0,
                bit_list: bits::indices(file.levels[0][0]),
                pos: 0,
            }],
            cursors: [0; MAX_DEPTH as usize],
            digits: [0; MAX_DEPTH as usize],
        }
    }

    fn next(&mut self, file: &VolaFile) -> Option<Voxel> {
        let depth = file.header.depth as usize;
        loop {
            let frame = self.stack.last_mut()?;
            if frame.pos >= frame.bit_list.len() {
                self.stack.pop();
                continue;
            }
            let bit = frame.bit_list[frame.pos];
            frame.pos += 1;
            let (level, word_idx) = (frame.level, frame.word_idx);
            self.digits[level] = bit;

            if level + 1 == depth {
                let (x, y, z) = path::coord_from_path(&self.digits[..depth]);
                let payload = file.payload.last().map(|words| words[word_idx]);
                return Some(Voxel { x, y, z, payload });
            }

            let child_idx = self.cursors[level + 1];
            self.cursors[level + 1] += 1;
            self.stack.push(Frame {
                level: level + 1,
                word_idx: child_idx,
                bit_list: bits::indices(file.levels[level + 1][child_idx]),
                pos: 0,
            });
        }
    }
}

/// Walk state for the dense layout: a linear scan of the terminal level.
struct DenseWalk {
    word_idx: usize,
    bit_list: Vec<u32>,
    pos: usize,
}

impl DenseWalk {
    fn new(file: &VolaFile) -> Self {
        let terminal = &file.levels[file.header.depth as usize - 1];
        DenseWalk {
            word_idx: 0,
            bit_list: bits::indices(terminal[0]),
            pos: 0,
        }
    }

    fn next(&mut self, file: &VolaFile) -> Option<Voxel> {
        let terminal = &file.levels[file.header.depth as usize - 1];
        let side = file.header.side() as usize;
        loop {
            if self.pos < self.bit_list.len() {
                let bit = self.bit_list[self.pos];
                self.pos += 1;
                let cell = self.word_idx * 64 + bit as usize;
                let payload = file.payload.last().map(|words| words[self.word_idx]);
                return Some(Voxel {
                    x: (cell % side) as u32,
                    y: (cell / side % side) as u32,
                    z: (cell / (side * side)) as u32,
                    payload,
                });
            }
            self.word_idx += 1;
            if self.word_idx >= terminal.len() {
                return None;
            }
            self.bit_list = bits::indices(terminal[self.word_idx]);
            self.pos = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Bounds;
    use crate::tree::VolaTree;
    use crate::writer::write_tree_to;
    use std::io::Cursor;

    fn tree(depth: u8, mode: Mode, nbits: u32) -> VolaTree {
        let side = path::grid_side(depth) as f64;
        let bounds = Bounds::new(0., 0., 0., side, side, side);
        VolaTree::new(depth, bounds, 2000, mode, nbits).unwrap()
    }

    fn decode(tree: &VolaTree) -> VolaFile {
        let mut buf = Vec::new();
        write_tree_to(tree, &mut buf, 0., 0.).unwrap();
        VolaFile::read_from(Cursor::new(buf)).unwrap()
    }

    #[test]
    fn level_sizes_follow_popcounts() {
        let mut t = tree(3, Mode::Sparse, 0);
        for coord in [(0, 0, 0), (1, 0, 0), (17, 3, 9), (63, 63, 63), (62, 63, 63)] {
            t.insert(coord, &[]).unwrap();
        }
        let f = decode(&t);

        assert_eq!(f.levels[0].len(), 1);
        for d in 1..3 {
            let parents: usize = f.levels[d - 1]
                .iter()
                .map(|w| bits::popcount(*w) as usize)
                .sum();
            assert_eq!(f.levels[d].len(), parents);
        }
        assert_eq!(f.voxel_count(), 5);
    }

    #[test]
    fn payload_round_trip_and_miss() {
        let mut t = tree(1, Mode::Sparse, 1);
        t.insert((2, 2, 2), &[0xab]).unwrap();
        let f = decode(&t);

        assert_eq!(f.get_voxel((2, 2, 2)).unwrap(), Some(0xab));
        assert_eq!(f.get_voxel((2, 2, 3)).unwrap(), None);
        assert!(f.contains((2, 2, 2)).unwrap());
        assert!(!f.contains((0, 0, 0)).unwrap());
    }

    #[test]
    fn lookup_walks_child_offsets() {
        let mut t = tree(2, Mode::Sparse, 0);
        t.insert((0, 0, 0), &[]).unwrap();
        t.insert((15, 15, 15), &[]).unwrap();
        let f = decode(&t);

        // path [63, 63]: one set bit below 63 at the root, so the corner
        // lives in the second level-1 word
        assert_eq!(f.get_voxel((15, 15, 15)).unwrap(), Some(0));
        assert_eq!(f.get_voxel((0, 0, 0)).unwrap(), Some(0));
        assert_eq!(f.get_voxel((15, 15, 14)).unwrap(), None);
        assert_eq!(f.get_voxel((8, 0, 0)).unwrap(), None);
    }

    #[test]
    fn lookup_rejects_out_of_grid() {
        let mut t = tree(1, Mode::Sparse, 0);
        t.insert((0, 0, 0), &[]).unwrap();
        let f = decode(&t);
        assert!(matches!(
            f.get_voxel((4, 0, 0)),
            Err(crate::Error::CoordOutOfGrid(4, 0, 0, 4))
        ));
    }

    #[test]
    fn enumerates_depth_first() {
        let mut t = tree(2, Mode::Sparse, 0);
        let coords = [(15, 15, 15), (0, 0, 0), (1, 0, 0), (0, 4, 0)];
        for c in coords {
            t.insert(c, &[]).unwrap();
        }
        let f = decode(&t);

        let seen: Vec<_> = f.voxels().map(|v| (v.x, v.y, v.z)).collect();
        // root bit 0 subtree first (both its voxels), then bit 16, then 63
        assert_eq!(seen, vec![(0, 0, 0), (1, 0, 0), (0, 4, 0), (15, 15, 15)]);
        for v in f.voxels() {
            assert_eq!(v.payload, None);
        }
    }

    #[test]
    fn enumeration_and_lookup_agree() {
        let mut t = tree(3, Mode::Sparse, 2);
        let coords = [(0, 0, 0), (5, 20, 63), (63, 0, 31), (13, 13, 13)];
        for (i, c) in coords.iter().enumerate() {
            t.insert(*c, &[i as u8 + 1, 0x40]).unwrap();
        }
        let f = decode(&t);

        let mut seen = 0;
        for v in f.voxels() {
            seen += 1;
            assert_eq!(f.get_voxel((v.x, v.y, v.z)).unwrap(), v.payload);
        }
        assert_eq!(seen, coords.len());
        assert_eq!(f.get_voxel((13, 13, 13)).unwrap(), Some(0x4004));
    }

    #[test]
    fn dense_round_trip() {
        let mut t = tree(2, Mode::Dense, 1);
        t.insert((0, 0, 0), &[0x11]).unwrap();
        t.insert((15, 3, 7), &[0x22]).unwrap();
        let f = decode(&t);

        assert_eq!(f.levels[1].len(), 64);
        let seen: Vec<_> = f.voxels().map(|v| (v.x, v.y, v.z)).collect();
        assert_eq!(seen, vec![(0, 0, 0), (15, 3, 7)]);
        assert_eq!(f.get_voxel((15, 3, 7)).unwrap(), Some(0x22));
        assert_eq!(f.get_voxel((15, 3, 8)).unwrap(), None);
    }

    #[test]
    fn truncated_file_is_detected() {
        let mut t = tree(2, Mode::Sparse, 0);
        t.insert((0, 0, 0), &[]).unwrap();
        t.insert((15, 15, 15), &[]).unwrap();
        let mut buf = Vec::new();
        write_tree_to(&t, &mut buf, 0., 0.).unwrap();

        // drop the last level-1 word
        buf.truncate(buf.len() - 8);
        assert!(matches!(
            VolaFile::read_from(Cursor::new(buf)),
            Err(crate::Error::Truncated(1))
        ));
    }

    #[test]
    fn crs_coords_scale_into_bounds() {
        let bounds = Bounds::new(100., 200., 300., 164., 232., 316.);
        let mut t = VolaTree::new(2, bounds, 29902, Mode::Sparse, 0).unwrap();
        t.insert((0, 0, 0), &[]).unwrap();
        t.insert((8, 4, 2), &[]).unwrap();
        let f = decode(&t);

        let coords = f.crs_coords();
        // extent is 64 (longest axis), side 16: one voxel spans 4 units
        assert_eq!(coords[0], [100., 200., 300.]);
        assert_eq!(coords[1], [132., 216., 308.]);
    }

    #[test]
    fn unset_crs_returns_voxel_coords() {
        let mut t = tree(1, Mode::Sparse, 0);
        t.insert((1, 2, 3), &[]).unwrap();
        let f = decode(&t);
        assert_eq!(f.crs_coords(), vec![[1., 2., 3.]]);
    }
}
