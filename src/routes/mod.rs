use axum::http::StatusCode;
use thiserror::Error;

use crate::geo::GeoError;
use crate::utils::error_codes;

pub mod auth;
pub mod carousel;
pub mod event;
pub mod venue;

/// Errors crossing the model layer boundary: a proximity-engine failure or
/// a content-store failure. The first failing step aborts the whole
/// operation; store failures are surfaced, not retried.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error("content store unavailable: {0}")]
    Store(#[from] sqlx::Error),

    #[error("identity provider request failed: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("{0}")]
    Auth(String),

    #[error("token generation failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl ModelError {
    pub fn status(&self) -> StatusCode {
        match self {
            ModelError::Geo(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ModelError::Geo(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ModelError::Store(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            ModelError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ModelError::Provider(_) | ModelError::Auth(_) => StatusCode::UNAUTHORIZED,
            ModelError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ModelError::Geo(GeoError::InvalidCoordinate { .. }) => error_codes::INVALID_COORDINATE,
            ModelError::Geo(GeoError::RadiusTooLarge { .. }) => error_codes::RADIUS_TOO_LARGE,
            ModelError::Geo(GeoError::InvalidRingCount(_)) => error_codes::INTERNAL_ERROR,
            ModelError::Store(sqlx::Error::RowNotFound) => error_codes::NOT_FOUND,
            ModelError::Store(_) => error_codes::INTERNAL_ERROR,
            ModelError::Provider(_) | ModelError::Auth(_) => error_codes::AUTH_FAILED,
            ModelError::Token(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_client_errors_map_to_bad_request() {
        let err = ModelError::from(GeoError::InvalidCoordinate {
            latitude: 91.0,
            longitude: 0.0,
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), error_codes::INVALID_COORDINATE);

        let err = ModelError::from(GeoError::RadiusTooLarge {
            radius_km: 9000.0,
            rings: 60,
            max_rings: 50,
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), error_codes::RADIUS_TOO_LARGE);
    }

    #[test]
    fn ring_count_violation_is_internal() {
        let err = ModelError::from(GeoError::InvalidRingCount(99));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let err = ModelError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), error_codes::NOT_FOUND);
    }
}
