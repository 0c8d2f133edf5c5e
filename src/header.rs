//! The fixed 80-byte file header.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use crate::bounds::Bounds;
use crate::{FORMAT_VERSION, HEADER_SIZE, MAX_DEPTH, MAX_PAYLOAD_BYTES};

/// Level layout, a tag on the tree rather than a subtype.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Only words with a set parent bit are stored
    Sparse,
    /// Every possible word at every level is stored
    Dense,
}

impl Mode {
    pub(crate) fn from_byte(byte: u8) -> crate::Result<Mode> {
        match byte {
            0 => Ok(Mode::Sparse),
            1 => Ok(Mode::Dense),
            other => Err(crate::Error::InvalidMode(other)),
        }
    }

    pub(crate) fn as_byte(self) -> u8 {
        match self {
            Mode::Sparse => 0,
            Mode::Dense => 1,
        }
    }
}

/// VOLA header data.
#[derive(Clone, Debug)]
pub struct VolaHeader {
    /// Sparse or dense level layout
    pub mode: Mode,
    /// Tree depth, 1 to 5
    pub depth: u8,
    /// Payload bytes per voxel, 0 for occupancy only
    pub nbits: u32,
    /// EPSG code of the source data, 2000 when unset
    pub crs: u32,
    /// Latitude of the bbox centroid, 0 when the CRS is unknown
    pub lat: f64,
    /// Longitude of the bbox centroid, 0 when the CRS is unknown
    pub lon: f64,
    /// Bounding box of the source data in its CRS
    pub bounds: Bounds,
}

impl VolaHeader {
    /// Reads and validates a header from a `Read`.
    pub fn read_from<R: Read>(mut read: R) -> crate::Result<Self> {
        let header_size = read.read_u32::<LittleEndian>()?;
        if header_size != HEADER_SIZE {
            return Err(crate::Error::InvalidHeaderSize(header_size));
        }
        let version = read.read_u16::<LittleEndian>()?;
        if version != FORMAT_VERSION {
            return Err(crate::Error::UnsupportedVersion(version));
        }
        let mode = Mode::from_byte(read.read_u8()?)?;
        let depth = read.read_u8()?;
        if depth < 1 || depth > MAX_DEPTH {
            return Err(crate::Error::InvalidDepth(depth));
        }
        let nbits = read.read_u32::<LittleEndian>()?;
        if nbits > MAX_PAYLOAD_BYTES {
            return Err(crate::Error::InvalidPayloadWidth(nbits));
        }
        let crs = read.read_u32::<LittleEndian>()?;
        let lat = read.read_f64::<LittleEndian>()?;
        let lon = read.read_f64::<LittleEndian>()?;
        let bounds = Bounds {
            min_x: read.read_f64::<LittleEndian>()?,
            min_y: read.read_f64::<LittleEndian>()?,
            min_z: read.read_f64::<LittleEndian>()?,
            max_x: read.read_f64::<LittleEndian>()?,
            max_y: read.read_f64::<LittleEndian>()?,
            max_z: read.read_f64::<LittleEndian>()?,
        };

        Ok(VolaHeader {
            mode,
            depth,
            nbits,
            crs,
            lat,
            lon,
            bounds,
        })
    }

    /// Writes the fixed 80 header bytes to a `Write`.
    pub fn write_to<W: Write>(&self, write: &mut W) -> crate::Result<()> {
        write.write_u32::<LittleEndian>(HEADER_SIZE)?;
        write.write_u16::<LittleEndian>(FORMAT_VERSION)?;
        write.write_u8(self.mode.as_byte())?;
        write.write_u8(self.depth)?;
        write.write_u32::<LittleEndian>(self.nbits)?;
        write.write_u32::<LittleEndian>(self.crs)?;
        write.write_f64::<LittleEndian>(self.lat)?;
        write.write_f64::<LittleEndian>(self.lon)?;
        write.write_f64::<LittleEndian>(self.bounds.min_x)?;
        write.write_f64::<LittleEndian>(self.bounds.min_y)?;
        write.write_f64::<LittleEndian>(self.bounds.min_z)?;
        write.write_f64::<LittleEndian>(self.bounds.max_x)?;
        write.write_f64::<LittleEndian>(self.bounds.max_y)?;
        write.write_f64::<LittleEndian>(self.bounds.max_z)?;

        Ok(())
    }

    /// Reads just the header of a file, for indexing without decoding
    /// the levels.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let mut src = BufReader::new(File::open(path)?);
        VolaHeader::read_from(&mut src)
    }

    /// Whether the levels are stored sparsely.
    pub fn is_sparse(&self) -> bool {
        self.mode == Mode::Sparse
    }

    /// Voxel grid side length (4^depth).
    pub fn side(&self) -> u32 {
        crate::path::grid_side(self.depth)
    }

    /// Length of the voxelised cube's edge, the longest bbox axis.
    pub fn extent(&self) -> f64 {
        self.bounds.longest_side()
    }

    /// Edge length of a single voxel in source units.
    pub fn voxel_size(&self) -> f64 {
        self.extent() / self.side() as f64
    }
}
