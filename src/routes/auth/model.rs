use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::routes::ModelError;
use crate::utils::otp_identity_digest;

const OTPLESS_USERINFO_URL: &str = "https://auth.otpless.app/auth/userInfo";

/// Consumer account, identified by phone number from the OTP provider.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserPublic {
    pub id: Uuid,
    pub phone_number: String,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Venue-owner account, identified by email.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserBusiness {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ProviderUserInfo {
    mobile_number: Option<String>,
    email: Option<String>,
}

async fn provider_user_info(
    client_id: &str,
    client_secret: &str,
    token: &str,
) -> Result<ProviderUserInfo, ModelError> {
    let client = reqwest::Client::new();
    let response = client
        .post(OTPLESS_USERINFO_URL)
        .form(&[
            ("code", token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .send()
        .await?
        .error_for_status()?;

    Ok(response.json().await?)
}

/// Phone number behind an OTP-provider token. Without provider credentials
/// configured, falls back to a deterministic digest of the token so
/// development logins still resolve to stable identities.
pub async fn resolve_phone_identity(
    config: &Config,
    otpless_token: &str,
) -> Result<String, ModelError> {
    match (&config.otpless_client_id, &config.otpless_client_secret) {
        (Some(id), Some(secret)) => {
            let info = provider_user_info(id, secret, otpless_token).await?;
            info.mobile_number
                .ok_or_else(|| ModelError::Auth("Provider returned no phone number".into()))
        }
        _ => Ok(otp_identity_digest(otpless_token)),
    }
}

/// Email behind a business-login provider token, with the same development
/// fallback.
pub async fn resolve_email_identity(
    config: &Config,
    otpless_token: &str,
) -> Result<String, ModelError> {
    match (&config.otpless_client_id, &config.otpless_client_secret) {
        (Some(id), Some(secret)) => {
            let info = provider_user_info(id, secret, otpless_token).await?;
            info.email
                .ok_or_else(|| ModelError::Auth("Provider returned no email".into()))
        }
        _ => Ok(format!(
            "dev-{}@example.com",
            otp_identity_digest(otpless_token)
        )),
    }
}

impl UserPublic {
    pub async fn upsert(pool: &PgPool, phone_number: &str) -> Result<Self, ModelError> {
        let user: UserPublic = sqlx::query_as(
            r#"
            INSERT INTO user_public (id, phone_number, is_active, created_at)
            VALUES ($1, $2, TRUE, NOW())
            ON CONFLICT (phone_number) DO UPDATE SET is_active = TRUE
            RETURNING id, phone_number, is_active, refresh_token, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(phone_number)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }
}

impl UserBusiness {
    pub async fn upsert(pool: &PgPool, email: &str) -> Result<Self, ModelError> {
        let user: UserBusiness = sqlx::query_as(
            r#"
            INSERT INTO user_business (id, email, is_active, created_at)
            VALUES ($1, $2, TRUE, NOW())
            ON CONFLICT (email) DO UPDATE SET is_active = TRUE
            RETURNING id, email, is_active, refresh_token, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }
}

fn user_table(is_business: bool) -> &'static str {
    if is_business { "user_business" } else { "user_public" }
}

pub async fn store_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    is_business: bool,
    refresh_token: &str,
) -> Result<(), ModelError> {
    sqlx::query(&format!(
        "UPDATE {} SET refresh_token = $2 WHERE id = $1",
        user_table(is_business)
    ))
    .bind(user_id)
    .bind(refresh_token)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn clear_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    is_business: bool,
) -> Result<(), ModelError> {
    sqlx::query(&format!(
        "UPDATE {} SET refresh_token = NULL WHERE id = $1",
        user_table(is_business)
    ))
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Looks the user up in both account tables; a refresh token only names a
/// subject, not which kind of account it belongs to.
pub async fn find_refresh_state(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<(bool, Option<String>)>, ModelError> {
    let public: Option<(Option<String>,)> =
        sqlx::query_as("SELECT refresh_token FROM user_public WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    if let Some((token,)) = public {
        return Ok(Some((false, token)));
    }

    let business: Option<(Option<String>,)> =
        sqlx::query_as("SELECT refresh_token FROM user_business WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(business.map(|(token,)| (true, token)))
}
