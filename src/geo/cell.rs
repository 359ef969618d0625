use h3o::{CellIndex, LatLng, Resolution};

use super::GeoError;

/// Map a coordinate to the cell containing it at the given resolution.
///
/// Deterministic: identical inputs always produce the same cell, across
/// invocations and restarts. Non-finite or out-of-range coordinates are
/// rejected rather than wrapped.
pub fn cell_of(
    latitude: f64,
    longitude: f64,
    resolution: Resolution,
) -> Result<CellIndex, GeoError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(GeoError::InvalidCoordinate {
            latitude,
            longitude,
        });
    }

    let coord = LatLng::new(latitude, longitude).map_err(|_| GeoError::InvalidCoordinate {
        latitude,
        longitude,
    })?;

    Ok(coord.to_cell(resolution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::RESOLUTION;

    #[test]
    fn same_input_same_cell() {
        let a = cell_of(12.9716, 77.5946, RESOLUTION).unwrap();
        let b = cell_of(12.9716, 77.5946, RESOLUTION).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn resolution_is_encoded_in_the_cell() {
        let cell = cell_of(12.9716, 77.5946, RESOLUTION).unwrap();
        assert_eq!(cell.resolution(), RESOLUTION);
    }

    #[test]
    fn nearby_points_in_same_small_cell() {
        // ~1 m apart, far below the ~174 m edge length at resolution 9.
        let a = cell_of(12.971600, 77.594600, RESOLUTION).unwrap();
        let b = cell_of(12.971605, 77.594605, RESOLUTION).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        assert!(matches!(
            cell_of(90.01, 0.0, RESOLUTION),
            Err(GeoError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            cell_of(-90.01, 0.0, RESOLUTION),
            Err(GeoError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_longitude() {
        assert!(matches!(
            cell_of(0.0, 180.01, RESOLUTION),
            Err(GeoError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        assert!(matches!(
            cell_of(f64::NAN, 0.0, RESOLUTION),
            Err(GeoError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            cell_of(0.0, f64::INFINITY, RESOLUTION),
            Err(GeoError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn range_boundaries_are_valid() {
        assert!(cell_of(90.0, 180.0, RESOLUTION).is_ok());
        assert!(cell_of(-90.0, -180.0, RESOLUTION).is_ok());
    }
}
