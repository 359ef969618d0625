use h3o::CellIndex;

use super::GeoError;

/// Number of rings needed for a radius search around `origin`.
///
/// The origin cell's area stands in for the average cell area of the
/// neighborhood: the hexagon is treated as a circle of equal area, giving
/// an approximate cell radius `r_hex = sqrt(2A / (3√3))`, and the ring
/// count is `floor(radius_km / r_hex)`. Near the grid's twelve pentagons
/// this estimate is systematically biased; that imprecision is accepted,
/// the disk guarantees membership, not exact distance.
///
/// Non-positive (or NaN) radii collapse to 0 rings, the origin cell alone.
/// A radius that would need more than `max_rings` rings fails with
/// [`GeoError::RadiusTooLarge`] because expansion cost grows quadratically
/// with the ring count.
pub fn rings_for_radius(
    origin: CellIndex,
    radius_km: f64,
    max_rings: u32,
) -> Result<u32, GeoError> {
    if !(radius_km > 0.0) {
        return Ok(0);
    }

    let area_km2 = origin.area_km2();
    let hex_radius_km = (2.0 * area_km2 / (3.0 * 3.0_f64.sqrt())).sqrt();

    // Saturating cast, so an absurd radius lands on u32::MAX and trips the
    // bound check instead of overflowing.
    let rings = (radius_km / hex_radius_km).floor() as u32;

    if rings > max_rings {
        return Err(GeoError::RadiusTooLarge {
            radius_km,
            rings,
            max_rings,
        });
    }

    Ok(rings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{MAX_RING_COUNT, RESOLUTION, cell_of};

    fn bangalore_cell() -> CellIndex {
        cell_of(12.9716, 77.5946, RESOLUTION).unwrap()
    }

    #[test]
    fn zero_radius_is_zero_rings() {
        assert_eq!(rings_for_radius(bangalore_cell(), 0.0, MAX_RING_COUNT), Ok(0));
    }

    #[test]
    fn negative_radius_is_zero_rings() {
        assert_eq!(
            rings_for_radius(bangalore_cell(), -2.5, MAX_RING_COUNT),
            Ok(0)
        );
    }

    #[test]
    fn nan_radius_is_zero_rings() {
        assert_eq!(
            rings_for_radius(bangalore_cell(), f64::NAN, MAX_RING_COUNT),
            Ok(0)
        );
    }

    #[test]
    fn monotonically_non_decreasing_in_radius() {
        let origin = bangalore_cell();
        let mut previous = 0;
        for radius in [0.1, 0.5, 1.0, 2.0, 3.0, 5.0, 8.0] {
            let rings = rings_for_radius(origin, radius, MAX_RING_COUNT).unwrap();
            assert!(rings >= previous, "rings shrank at radius {radius}");
            previous = rings;
        }
    }

    #[test]
    fn sub_cell_radius_stays_at_zero_rings() {
        // 10 m is far below the ~200 m effective cell radius at resolution 9.
        assert_eq!(
            rings_for_radius(bangalore_cell(), 0.01, MAX_RING_COUNT),
            Ok(0)
        );
    }

    #[test]
    fn oversized_radius_is_rejected() {
        let err = rings_for_radius(bangalore_cell(), 1000.0, MAX_RING_COUNT).unwrap_err();
        match err {
            GeoError::RadiusTooLarge {
                rings, max_rings, ..
            } => {
                assert!(rings > max_rings);
                assert_eq!(max_rings, MAX_RING_COUNT);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn infinite_radius_is_rejected_not_looped() {
        assert!(matches!(
            rings_for_radius(bangalore_cell(), f64::INFINITY, MAX_RING_COUNT),
            Err(GeoError::RadiusTooLarge { .. })
        ));
    }
}
