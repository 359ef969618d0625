use thiserror::Error;

/// Failures of the proximity engine.
///
/// `InvalidCoordinate` and `RadiusTooLarge` come from malformed or
/// out-of-policy caller input and map to 4xx responses. `InvalidRingCount`
/// is an internal invariant violation: ring counts reaching the disk
/// expander have already been bounded by the ring estimator, so hitting it
/// indicates a bug, not bad input.
#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("radius {radius_km} km needs {rings} rings, above the limit of {max_rings}")]
    RadiusTooLarge {
        radius_km: f64,
        rings: u32,
        max_rings: u32,
    },

    #[error("ring count {0} exceeds the expansion ceiling")]
    InvalidRingCount(u32),
}

impl GeoError {
    /// Whether the error is caused by caller input (as opposed to an
    /// internal bug), used to pick the response status.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, GeoError::InvalidRingCount(_))
    }
}
