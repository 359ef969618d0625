use axum::{
    Extension,
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::middleware::require_business_user;
use crate::utils::{Claims, error_codes, error_to_api_response, success_to_api_response};

use super::model::{CreateVenueRequest, UpdateVenueRequest, Venue};

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub venue_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub kind: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub venue_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
}

#[axum::debug_handler]
pub async fn create_venue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateVenueRequest>,
) -> impl IntoResponse {
    let user_id = match require_business_user(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match Venue::create(&state.pool, req, user_id).await {
        Ok(venue) => (StatusCode::CREATED, success_to_api_response(venue)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn find_by_id(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> impl IntoResponse {
    match Venue::find_by_id(&state.pool, &state.redis, query.venue_id).await {
        Ok(Some(venue)) => (StatusCode::OK, success_to_api_response(venue)),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "Venue not found".to_string()),
        ),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn list_venues(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let page = query.page.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    match Venue::list(&state.pool, query.kind.as_deref(), page, limit).await {
        Ok(venues) => (StatusCode::OK, success_to_api_response(venues)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn update_venue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<IdQuery>,
    Json(req): Json<UpdateVenueRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_business_user(&claims) {
        return resp;
    }

    match Venue::update_details(&state.pool, &state.redis, query.venue_id, req).await {
        Ok(venue) => (StatusCode::OK, success_to_api_response(venue)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn update_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateLocationRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_business_user(&claims) {
        return resp;
    }

    match Venue::update_location(
        &state.pool,
        &state.redis,
        req.venue_id,
        req.latitude,
        req.longitude,
    )
    .await
    {
        Ok(venue) => (StatusCode::OK, success_to_api_response(venue)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn delete_venue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<IdQuery>,
) -> impl IntoResponse {
    if let Err(resp) = require_business_user(&claims) {
        return resp;
    }

    match Venue::delete(&state.pool, &state.redis, query.venue_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "deleted": true })),
        ),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}
