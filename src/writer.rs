//! Serialising a tree to a `.vol` file.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::crs::{self, Reprojector};
use crate::header::Mode;
use crate::path::dense_level_len;
use crate::tree::VolaTree;

/// Writes `tree` to `path` through a temp file in the same directory,
/// so a failed write never leaves a partial file behind.
pub(crate) fn write_tree(
    tree: &VolaTree,
    path: &Path,
    reprojector: Option<&dyn Reprojector>,
) -> crate::Result<()> {
    if tree.is_empty() {
        return Err(crate::Error::EmptyTree);
    }

    let (lat, lon) = crs::wgs84_centroid(tree.bounds(), tree.crs(), reprojector);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;
    let mut out = BufWriter::new(tmp.as_file());
    write_tree_to(tree, &mut out, lat, lon)?;
    out.flush()?;
    drop(out);
    tmp.persist(path).map_err(|e| crate::Error::Io(e.error))?;

    log::info!("wrote {}", path.display());
    Ok(())
}

/// Emits the header and every level, occupancy words first and payload
/// words second per level, in the layout the mode prescribes.
pub(crate) fn write_tree_to<W: Write>(
    tree: &VolaTree,
    write: &mut W,
    lat: f64,
    lon: f64,
) -> crate::Result<()> {
    tree.header_with(lat, lon).write_to(write)?;

    for (d, level) in tree.levels.iter().enumerate() {
        let count = match tree.mode() {
            Mode::Sparse => {
                // scratch offsets ascend in serialised order, and every
                // stored word has at least one bit set
                for word in level.occ.values() {
                    write.write_u64::<LittleEndian>(*word)?;
                }
                if tree.nbits() > 0 {
                    for off in level.occ.keys() {
                        let word = level.pay.get(off).copied().unwrap_or(0);
                        write.write_u64::<LittleEndian>(word)?;
                    }
                }
                level.occ.len()
            }
            Mode::Dense => {
                let len = dense_level_len(d as u8);
                for off in 0..len {
                    let word = level.occ.get(&off).copied().unwrap_or(0);
                    write.write_u64::<LittleEndian>(word)?;
                }
                if tree.nbits() > 0 {
                    for off in 0..len {
                        let word = level.pay.get(&off).copied().unwrap_or(0);
                        write.write_u64::<LittleEndian>(word)?;
                    }
                }
                len
            }
        };
        log::info!("level {d}: {count} occupancy words");
    }
    Ok(())
}
