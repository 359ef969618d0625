use std::env;
use std::time::Duration;

use crate::geo;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub access_token_expiration_secs: u64,
    pub refresh_token_expiration_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    /// Radius applied to nearby lookups that do not pass one, in km.
    pub default_radius_km: f64,
    /// Ring-count bound for radius searches, clamped to the engine ceiling.
    pub max_ring_count: u32,
    /// OTP provider credentials; when unset, identity resolution falls back
    /// to the deterministic development stub.
    pub otpless_client_id: Option<String>,
    pub otpless_client_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let access_expiration = env::var("ACCESS_TOKEN_EXPIRATION")
            .unwrap_or_default()
            .trim_end_matches('m')
            .parse::<u64>()
            .unwrap_or(30);
        let refresh_expiration = env::var("REFRESH_TOKEN_EXPIRATION")
            .unwrap_or_default()
            .trim_end_matches('d')
            .parse::<u64>()
            .unwrap_or(30);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            server_host: env::var("SERVER_HOST")?,
            server_port: env::var("SERVER_PORT")?.parse().unwrap_or(3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".into()),
            jwt_secret: env::var("JWT_SECRET")?,
            access_token_expiration_secs: access_expiration * 60,
            refresh_token_expiration_secs: refresh_expiration * 24 * 3600,
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW")
                .map(|v| v.parse().unwrap_or(60))
                .unwrap_or(60),
            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .map(|v| v.parse().unwrap_or(100))
                .unwrap_or(100),
            default_radius_km: env::var("DEFAULT_RADIUS_KM")
                .map(|v| v.parse().unwrap_or(3.0))
                .unwrap_or(3.0),
            max_ring_count: env::var("MAX_RING_COUNT")
                .map(|v| v.parse().unwrap_or(geo::MAX_RING_COUNT))
                .unwrap_or(geo::MAX_RING_COUNT)
                .min(geo::MAX_RING_COUNT),
            otpless_client_id: env::var("OTPLESS_CLIENT_ID").ok(),
            otpless_client_secret: env::var("OTPLESS_CLIENT_SECRET").ok(),
        })
    }

    pub fn access_token_expiration(&self) -> Duration {
        Duration::from_secs(self.access_token_expiration_secs)
    }

    pub fn refresh_token_expiration(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://localhost".into(),
            jwt_secret: "secret".into(),
            access_token_expiration_secs: 1800,
            refresh_token_expiration_secs: 30 * 24 * 3600,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
            server_host: "127.0.0.1".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
            default_radius_km: 3.0,
            max_ring_count: geo::MAX_RING_COUNT,
            otpless_client_id: None,
            otpless_client_secret: None,
        }
    }

    #[test]
    fn durations_derive_from_seconds() {
        let config = base_config();
        assert_eq!(config.access_token_expiration().as_secs(), 1800);
        assert_eq!(config.rate_limit_window().as_secs(), 60);
    }
}
