//! Derived 2D and 3D views of a decoded tree: per-level z-slices, a
//! flattened ground map and a dense occupancy grid.

use std::io::Write;

use crate::path::grid_side;
use crate::reader::VolaFile;

/// A square binary image, one byte per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    side: usize,
    pixels: Vec<u8>,
}

impl Raster {
    fn blank(side: usize) -> Raster {
        Raster {
            side,
            pixels: vec![0; side * side],
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[x + y * self.side]
    }

    fn mark(&mut self, x: usize, y: usize) {
        self.pixels[x + y * self.side] = 1;
    }

    /// Serialises the raster as an ASCII PGM (`P2`) image.
    pub fn write_pgm<W: Write>(&self, write: &mut W) -> crate::Result<()> {
        writeln!(write, "P2")?;
        writeln!(write, "{} {}", self.side, self.side)?;
        writeln!(write, "1")?;
        for y in 0..self.side {
            let row = &self.pixels[y * self.side..(y + 1) * self.side];
            let line: Vec<String> = row.iter().map(u8::to_string).collect();
            writeln!(write, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Occupancy z-slices for every level: element `d - 1` holds `4^d`
/// rasters of side `4^d`, one per z plane at that level.
pub fn slice_planes(file: &VolaFile) -> Vec<Vec<Raster>> {
    let depth = file.header().depth;
    (1..=depth)
        .map(|d| {
            let shift = 2 * (depth - d) as u32;
            let side = grid_side(d) as usize;
            let mut slices = vec![Raster::blank(side); side];
            for v in file.voxels() {
                slices[(v.z >> shift) as usize]
                    .mark((v.x >> shift) as usize, (v.y >> shift) as usize);
            }
            slices
        })
        .collect()
}

/// Flattens the volume to a ground map: pixel `(x, y)` is set when any
/// voxel column member at height `z >= h_min` is occupied.
pub fn ground_projection(file: &VolaFile, h_min: u32) -> Raster {
    let side = file.header().side() as usize;
    let mut map = Raster::blank(side);
    for v in file.voxels() {
        if v.z >= h_min {
            map.mark(v.x as usize, v.y as usize);
        }
    }
    map
}

/// Materialises the full `side^3` occupancy grid, one byte per voxel at
/// linear index `x + y*side + z*side^2`.
pub fn dense_grid(file: &VolaFile) -> Vec<u8> {
    let side = file.header().side() as usize;
    let mut grid = vec![0u8; side * side * side];
    for v in file.voxels() {
        grid[v.x as usize + v.y as usize * side + v.z as usize * side * side] = 1;
    }
    grid
}
