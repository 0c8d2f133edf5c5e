//! EPSG code handling and the reprojection seam.
//!
//! Reprojection itself is an external collaborator. The writer only
//! needs the bbox centroid in WGS84 for the header, and degrades to
//! zero lat/lon whenever that cannot be computed.

use crate::bounds::Bounds;
use crate::CRS_UNSET;

/// EPSG code of WGS84, the header's lat/lon datum.
pub const EPSG_WGS84: u32 = 4326;

/// Coordinate reprojection between two EPSG systems.
///
/// Implementations wrap whatever projection engine is available; `None`
/// signals the transform could not be carried out.
pub trait Reprojector {
    fn reproject(&self, src_epsg: u32, dst_epsg: u32, x: f64, y: f64) -> Option<(f64, f64)>;
}

/// Whether the EPSG code is present in the bundled CRS registry.
pub fn known_epsg(code: u32) -> bool {
    u16::try_from(code)
        .ok()
        .and_then(crs_definitions::from_code)
        .is_some()
}

/// WGS84 position of the bbox centroid, as `(lat, lon)`.
///
/// Returns `(0, 0)` when the CRS is the unset sentinel, the EPSG code is
/// unknown, no reprojector is available or the reprojection fails; only
/// the sentinel case is silent.
pub(crate) fn wgs84_centroid(
    bounds: &Bounds,
    crs: u32,
    reprojector: Option<&dyn Reprojector>,
) -> (f64, f64) {
    if crs == CRS_UNSET {
        return (0., 0.);
    }
    if !known_epsg(crs) {
        log::warn!("EPSG code {crs} not found in the CRS registry, writing lat/lon 0");
        return (0., 0.);
    }

    let (cx, cy, _) = bounds.centroid();
    match reprojector.and_then(|r| r.reproject(crs, EPSG_WGS84, cx, cy)) {
        Some((lon, lat)) => (lat, lon),
        None => {
            log::warn!("could not reproject EPSG {crs} centroid to WGS84, writing lat/lon 0");
            (0., 0.)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shift;

    impl Reprojector for Shift {
        fn reproject(&self, _src: u32, dst: u32, x: f64, y: f64) -> Option<(f64, f64)> {
            assert_eq!(dst, EPSG_WGS84);
            Some((x + 1., y + 2.))
        }
    }

    struct Broken;

    impl Reprojector for Broken {
        fn reproject(&self, _: u32, _: u32, _: f64, _: f64) -> Option<(f64, f64)> {
            None
        }
    }

    #[test]
    fn unset_sentinel_skips_reprojection() {
        let b = Bounds::new(0., 0., 0., 2., 2., 2.);
        assert_eq!(wgs84_centroid(&b, CRS_UNSET, Some(&Shift)), (0., 0.));
    }

    #[test]
    fn known_code_goes_through_reprojector() {
        let b = Bounds::new(0., 0., 0., 2., 4., 0.);
        // 29902 is the Irish grid; reprojector returns (lon, lat)
        let (lat, lon) = wgs84_centroid(&b, 29902, Some(&Shift));
        assert_eq!((lat, lon), (4., 2.));
    }

    #[test]
    fn degrades_on_failure() {
        let b = Bounds::new(0., 0., 0., 2., 2., 2.);
        assert_eq!(wgs84_centroid(&b, 29902, Some(&Broken)), (0., 0.));
        assert_eq!(wgs84_centroid(&b, 29902, None), (0., 0.));
        // far outside any assigned EPSG range
        assert_eq!(wgs84_centroid(&b, 65000, Some(&Shift)), (0., 0.));
    }

    #[test]
    fn registry_lookup() {
        assert!(known_epsg(4326));
        assert!(!known_epsg(1_000_000));
    }
}
