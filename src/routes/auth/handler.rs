use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::routes::ModelError;
use crate::utils::{
    Claims, error_codes, error_to_api_response, generate_access_token, generate_refresh_token,
    success_to_api_response, verify_refresh_token,
};

use super::model::{
    UserBusiness, UserPublic, clear_refresh_token, find_refresh_state, resolve_email_identity,
    resolve_phone_identity, store_refresh_token,
};

#[derive(Debug, Deserialize)]
pub struct OtplessTokenRequest {
    pub otpless_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserAuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
}

async fn issue_tokens(
    state: &AppState,
    user_id: Uuid,
    is_business: bool,
) -> Result<UserAuthResponse, ModelError> {
    let subject = user_id.to_string();
    let (access_token, _) = generate_access_token(&subject, is_business, &state.config)?;
    let (refresh_token, _) = generate_refresh_token(&subject, &state.config)?;

    store_refresh_token(&state.pool, user_id, is_business, &refresh_token).await?;

    Ok(UserAuthResponse {
        access_token,
        refresh_token,
        issued_at: Utc::now(),
    })
}

/// OTP-provider login for consumers: resolve the token to a phone number,
/// create the account on first sight, hand back a token pair.
#[axum::debug_handler]
pub async fn verify_public_token(
    State(state): State<AppState>,
    Json(req): Json<OtplessTokenRequest>,
) -> impl IntoResponse {
    let phone_number = match resolve_phone_identity(&state.config, &req.otpless_token).await {
        Ok(phone) => phone,
        Err(e) => return (e.status(), error_to_api_response(e.code(), e.to_string())),
    };

    let user = match UserPublic::upsert(&state.pool, &phone_number).await {
        Ok(user) => user,
        Err(e) => return (e.status(), error_to_api_response(e.code(), e.to_string())),
    };

    match issue_tokens(&state, user.id, false).await {
        Ok(resp) => (StatusCode::OK, success_to_api_response(resp)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn verify_business_token(
    State(state): State<AppState>,
    Json(req): Json<OtplessTokenRequest>,
) -> impl IntoResponse {
    let email = match resolve_email_identity(&state.config, &req.otpless_token).await {
        Ok(email) => email,
        Err(e) => return (e.status(), error_to_api_response(e.code(), e.to_string())),
    };

    let user = match UserBusiness::upsert(&state.pool, &email).await {
        Ok(user) => user,
        Err(e) => return (e.status(), error_to_api_response(e.code(), e.to_string())),
    };

    match issue_tokens(&state, user.id, true).await {
        Ok(resp) => (StatusCode::OK, success_to_api_response(resp)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

/// Rotates the token pair when the presented refresh token is valid,
/// unexpired and matches the one stored for the user.
#[axum::debug_handler]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> impl IntoResponse {
    // Signature and expiry are checked by the JWT validation itself.
    let claims = match verify_refresh_token(&req.refresh_token, &state.config) {
        Ok(claims) => claims,
        Err(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response(
                    error_codes::AUTH_FAILED,
                    "Invalid or expired refresh token".to_string(),
                ),
            );
        }
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response(
                    error_codes::AUTH_FAILED,
                    "Invalid token subject".to_string(),
                ),
            );
        }
    };

    let (is_business, stored_token) = match find_refresh_state(&state.pool, user_id).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                error_to_api_response(error_codes::NOT_FOUND, "User not found".to_string()),
            );
        }
        Err(e) => return (e.status(), error_to_api_response(e.code(), e.to_string())),
    };

    if stored_token.as_deref() != Some(req.refresh_token.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(
                error_codes::AUTH_FAILED,
                "Refresh token has been rotated or revoked".to_string(),
            ),
        );
    }

    match issue_tokens(&state, user_id, is_business).await {
        Ok(resp) => (StatusCode::OK, success_to_api_response(resp)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

/// Drops the stored refresh token; the access token simply ages out.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response(
                    error_codes::AUTH_FAILED,
                    "Invalid token subject".to_string(),
                ),
            );
        }
    };

    match clear_refresh_token(&state.pool, user_id, claims.is_business).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({
                "message": "Logout successful, refresh token invalidated"
            })),
        ),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}
