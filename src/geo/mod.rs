//! Hexagonal-grid proximity engine.
//!
//! Venues and carousel posters are indexed by the H3 cell containing their
//! coordinates, at a single fixed resolution. A nearby lookup maps the query
//! point to its cell, sizes the search as a ring count derived from the cell
//! area, expands the origin into a disk of candidate cells, and intersects
//! that set against the content store.
//!
//! All functions here are pure; the store query lives in the model layer.

mod cell;
mod disk;
mod error;
mod rings;

pub use cell::cell_of;
pub use disk::disk;
pub use error::GeoError;
pub use rings::rings_for_radius;

use std::collections::HashSet;

use h3o::{CellIndex, Resolution};

/// Grid resolution used for every stored `h3_index`. Average cell edge
/// length at resolution 9 is roughly 174 m. Cell ids computed at different
/// resolutions never compare equal, so this is fixed for the whole system.
pub const RESOLUTION: Resolution = Resolution::Nine;

/// Hard ceiling on ring expansion. Disk size grows as 3k²+3k+1, so the
/// expansion cost is quadratic in k; configuration may lower this bound but
/// never raise it.
pub const MAX_RING_COUNT: u32 = 50;

/// Candidate cells for a radius search around a coordinate: index the
/// origin, estimate the ring count, expand the disk.
///
/// Fails before any store access when the coordinate is malformed or the
/// radius exceeds the ring-count bound.
pub fn nearby_cells(
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    max_rings: u32,
) -> Result<HashSet<CellIndex>, GeoError> {
    let origin = cell_of(latitude, longitude, RESOLUTION)?;
    let rings = rings_for_radius(origin, radius_km, max_rings)?;
    disk(origin, rings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANGALORE: (f64, f64) = (12.9716, 77.5946);

    #[test]
    fn nearby_cells_zero_radius_is_origin_cell() {
        let cells = nearby_cells(BANGALORE.0, BANGALORE.1, 0.0, MAX_RING_COUNT).unwrap();
        let origin = cell_of(BANGALORE.0, BANGALORE.1, RESOLUTION).unwrap();
        assert_eq!(cells, HashSet::from([origin]));
    }

    #[test]
    fn nearby_cells_rejects_bad_coordinate_before_expansion() {
        let err = nearby_cells(91.0, 77.5946, 3.0, MAX_RING_COUNT).unwrap_err();
        assert!(matches!(err, GeoError::InvalidCoordinate { .. }));
    }

    #[test]
    fn nearby_cells_rejects_oversized_radius() {
        let err = nearby_cells(BANGALORE.0, BANGALORE.1, 500.0, MAX_RING_COUNT).unwrap_err();
        assert!(matches!(err, GeoError::RadiusTooLarge { .. }));
    }

    #[test]
    fn bangalore_three_km_scenario() {
        let origin = cell_of(BANGALORE.0, BANGALORE.1, RESOLUTION).unwrap();
        let rings = rings_for_radius(origin, 3.0, MAX_RING_COUNT).unwrap();
        assert!((10..=20).contains(&rings), "unexpected ring count {rings}");

        let cells = nearby_cells(BANGALORE.0, BANGALORE.1, 3.0, MAX_RING_COUNT).unwrap();
        let expected = 3 * rings * rings + 3 * rings + 1;
        assert_eq!(cells.len(), expected as usize);
    }
}
