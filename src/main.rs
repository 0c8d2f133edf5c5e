//! Dump tool: prints the header and occupied voxels of a `.vol` file.

use std::env;
use std::process::exit;

use vola_rs::VolaFile;

fn main() -> vola_rs::Result<()> {
    let volfn = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: vola-rs <file.vol>");
        exit(2);
    });

    let file = VolaFile::from_path(&volfn)?;
    let header = file.header();

    println!("file         {volfn}");
    println!("mode         {:?}", header.mode);
    println!("depth        {}", header.depth);
    println!("side         {}", header.side());
    println!("nbits        {}", header.nbits);
    println!("crs          {}", header.crs);
    println!("lat/lon      {} {}", header.lat, header.lon);
    println!(
        "bbox         ({}, {}, {}) .. ({}, {}, {})",
        header.bounds.min_x,
        header.bounds.min_y,
        header.bounds.min_z,
        header.bounds.max_x,
        header.bounds.max_y,
        header.bounds.max_z
    );
    println!("voxels       {}", file.voxel_count());

    for voxel in file.voxels() {
        match voxel.payload {
            Some(payload) => {
                println!("{} {} {} 0x{payload:016x}", voxel.x, voxel.y, voxel.z)
            }
            None => println!("{} {} {}", voxel.x, voxel.y, voxel.z),
        }
    }

    Ok(())
}
