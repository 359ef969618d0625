use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use crate::{
    AppState,
    utils::{ApiResponse, Claims, error_codes, error_to_api_response, verify_token},
};

/// Validates the bearer token and stashes the decoded claims in request
/// extensions for the handlers behind this layer.
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = auth_header
        .as_ref()
        .and_then(|TypedHeader(Authorization(bearer))| {
            verify_token(bearer.token(), &state.config).ok()
        });

    match claims {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            error_to_api_response::<()>(
                error_codes::AUTH_FAILED,
                "Missing or invalid access token".to_string(),
            ),
        )
            .into_response(),
    }
}

/// Write endpoints are gated on business accounts; consumer tokens can only
/// read. Returns the caller's id on success.
pub fn require_business_user<T>(
    claims: &Claims,
) -> Result<Uuid, (StatusCode, Json<ApiResponse<T>>)> {
    if !claims.is_business {
        return Err((
            StatusCode::FORBIDDEN,
            error_to_api_response(
                error_codes::PERMISSION_DENIED,
                "Business account required".to_string(),
            ),
        ));
    }

    Uuid::parse_str(&claims.sub).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(error_codes::AUTH_FAILED, "Invalid token subject".to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(is_business: bool, sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            exp: 0,
            iat: 0,
            is_business,
        }
    }

    #[test]
    fn consumer_token_is_rejected_for_writes() {
        let id = Uuid::new_v4();
        assert!(require_business_user::<()>(&claims(false, &id.to_string())).is_err());
    }

    #[test]
    fn business_token_yields_user_id() {
        let id = Uuid::new_v4();
        let parsed = require_business_user::<()>(&claims(true, &id.to_string())).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn malformed_subject_is_rejected() {
        assert!(require_business_user::<()>(&claims(true, "not-a-uuid")).is_err());
    }
}
