use axum::Json;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_data: Option<T>,
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const INVALID_COORDINATE: i32 = 1010;
    pub const RADIUS_TOO_LARGE: i32 = 1011;
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// Access-token claims carried through the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub is_business: bool,
}

/// Refresh-token claims; the `jti` makes every issued token distinct so a
/// rotated token never matches the one stored on the user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

pub fn generate_access_token(
    user_id: &str,
    is_business: bool,
    config: &Config,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = now.timestamp() + config.access_token_expiration().as_secs() as i64;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
        iat: now.timestamp(),
        is_business,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn generate_refresh_token(
    user_id: &str,
    config: &Config,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = now.timestamp() + config.refresh_token_expiration().as_secs() as i64;

    let claims = RefreshClaims {
        sub: user_id.to_string(),
        exp: expiration,
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub fn verify_refresh_token(
    token: &str,
    config: &Config,
) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Deterministic 8-digit identity derived from an OTP-provider token.
/// Development fallback for environments without provider credentials.
pub fn otp_identity_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let value = u64::from_be_bytes(digest[..8].try_into().unwrap_or_default());
    format!("{:08}", value % 100_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            redis_url: String::new(),
            jwt_secret: "test-secret".into(),
            access_token_expiration_secs: 1800,
            refresh_token_expiration_secs: 86400,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
            server_host: String::new(),
            server_port: 0,
            api_base_uri: "/api".into(),
            default_radius_km: 3.0,
            max_ring_count: crate::geo::MAX_RING_COUNT,
            otpless_client_id: None,
            otpless_client_secret: None,
        }
    }

    #[test]
    fn access_token_round_trips() {
        let config = test_config();
        let (token, exp) = generate_access_token("user-1", true, &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp, exp);
        assert!(claims.is_business);
    }

    #[test]
    fn refresh_tokens_are_unique_per_issue() {
        let config = test_config();
        let (a, _) = generate_refresh_token("user-1", &config).unwrap();
        let (b, _) = generate_refresh_token("user-1", &config).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn access_token_rejects_wrong_secret() {
        let config = test_config();
        let (token, _) = generate_access_token("user-1", false, &config).unwrap();
        let mut other = test_config();
        other.jwt_secret = "different".into();
        assert!(verify_token(&token, &other).is_err());
    }

    // Test assertions unwrap Results carrying the response envelope, so the
    // envelope has to be debug-printable.
    #[test]
    fn error_envelope_is_debug_printable() {
        let Json(resp) = error_to_api_response::<()>(error_codes::NOT_FOUND, "gone".into());
        let printed = format!("{resp:?}");
        assert!(printed.contains("1004"));
        assert!(printed.contains("gone"));
    }

    #[test]
    fn otp_digest_is_deterministic_and_eight_digits() {
        let a = otp_identity_digest("some-token");
        let b = otp_identity_digest("some-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(a, otp_identity_digest("another-token"));
    }
}
