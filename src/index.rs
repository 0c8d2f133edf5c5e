//! JSON summary of a folder of `.vol` files.
//!
//! Builds the per-dataset index the toolchain publishes next to the
//! data: one header summary per file, a folder-wide bbox and centroid,
//! and the attribution the dataset owner supplies.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::bounds::Bounds;
use crate::header::VolaHeader;

/// Caller-supplied dataset attribution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attribution {
    pub dataset: String,
    pub info: String,
    pub url: String,
    pub author: String,
    pub authorurl: String,
    pub license: String,
    pub licenseurl: String,
}

impl Attribution {
    /// Loads attribution from a JSON file, typically the `info.json`
    /// shipped alongside the data.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Header summary of a single file.
#[derive(Clone, Debug, Serialize)]
pub struct FileSummary {
    pub filename: String,
    pub bbox: [f64; 6],
    pub centroid: [f64; 3],
    pub sides: [f64; 3],
    pub crs: u32,
    pub lat: f64,
    pub lon: f64,
}

/// Folder-wide dataset summary, serialisable straight to JSON.
#[derive(Clone, Debug, Serialize)]
pub struct DatasetIndex {
    #[serde(flatten)]
    pub attribution: Attribution,
    pub files: Vec<FileSummary>,
    pub depth: u8,
    pub nbits: u32,
    pub crs: u32,
    pub mode: u8,
    pub bbox: [f64; 6],
    pub sides: [f64; 3],
    pub centroid: [f64; 3],
}

impl DatasetIndex {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Reads the header of every `.vol` file directly under `dir` (sorted
/// by name) and aggregates them into a [DatasetIndex].
pub fn index_dir<P: AsRef<Path>>(dir: P, attribution: Attribution) -> crate::Result<DatasetIndex> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "vol") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::new();
    let mut total = Bounds::default();
    let mut last: Option<VolaHeader> = None;
    for path in &paths {
        let header = VolaHeader::from_path(path)?;
        total.expand(&header.bounds);
        files.push(FileSummary {
            filename: path.display().to_string(),
            bbox: bbox_array(&header.bounds),
            centroid: centroid_array(&header.bounds),
            sides: header.bounds.sides(),
            crs: header.crs,
            lat: header.lat,
            lon: header.lon,
        });
        last = Some(header);
    }

    if files.is_empty() {
        log::warn!("no .vol files found to index");
        total = Bounds::new(0., 0., 0., 0., 0., 0.);
    }

    Ok(DatasetIndex {
        attribution,
        depth: last.as_ref().map_or(0, |h| h.depth),
        nbits: last.as_ref().map_or(0, |h| h.nbits),
        crs: last.as_ref().map_or(0, |h| h.crs),
        mode: last.as_ref().map_or(0, |h| h.mode.as_byte()),
        bbox: bbox_array(&total),
        sides: total.sides(),
        centroid: centroid_array(&total),
        files,
    })
}

fn bbox_array(b: &Bounds) -> [f64; 6] {
    [b.min_x, b.min_y, b.min_z, b.max_x, b.max_y, b.max_z]
}

fn centroid_array(b: &Bounds) -> [f64; 3] {
    let (x, y, z) = b.centroid();
    [x, y, z]
}
