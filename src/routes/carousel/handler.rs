use axum::{
    Extension,
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::middleware::require_business_user;
use crate::utils::{Claims, error_to_api_response, success_to_api_response};

use super::model::{CarouselPoster, CreatePosterRequest};

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub poster_id: Uuid,
}

/// Public discovery endpoint: live posters around the caller's coordinate.
#[axum::debug_handler]
pub async fn find_nearby_posters(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> impl IntoResponse {
    let radius_km = query.radius_km.unwrap_or(state.config.default_radius_km);

    match CarouselPoster::find_nearby(
        &state.pool,
        &state.redis,
        query.latitude,
        query.longitude,
        radius_km,
        state.config.max_ring_count,
        Utc::now(),
    )
    .await
    {
        Ok(posters) => (StatusCode::OK, success_to_api_response(posters)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn create_poster(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePosterRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_business_user(&claims) {
        return resp;
    }

    match CarouselPoster::create(&state.pool, req).await {
        Ok(poster) => (StatusCode::CREATED, success_to_api_response(poster)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn update_poster(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<IdQuery>,
    Json(req): Json<CreatePosterRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_business_user(&claims) {
        return resp;
    }

    match CarouselPoster::update(&state.pool, query.poster_id, req).await {
        Ok(poster) => (StatusCode::OK, success_to_api_response(poster)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn delete_poster(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<IdQuery>,
) -> impl IntoResponse {
    if let Err(resp) = require_business_user(&claims) {
        return resp;
    }

    match CarouselPoster::delete(&state.pool, query.poster_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "deleted": true })),
        ),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}
