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

use super::model::{CreateEventRequest, Event};

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub event_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct VenueQuery {
    pub venue_id: Uuid,
}

#[axum::debug_handler]
pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_business_user(&claims) {
        return resp;
    }

    match Event::create(&state.pool, req).await {
        Ok(event) => (StatusCode::CREATED, success_to_api_response(event)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn find_by_id(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> impl IntoResponse {
    match Event::find_by_id(&state.pool, query.event_id).await {
        Ok(Some(event)) => (StatusCode::OK, success_to_api_response(event)),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "Event not found".to_string()),
        ),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn find_by_venue(
    State(state): State<AppState>,
    Query(query): Query<VenueQuery>,
) -> impl IntoResponse {
    match Event::find_by_venue(&state.pool, query.venue_id).await {
        Ok(events) => (StatusCode::OK, success_to_api_response(events)),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<IdQuery>,
) -> impl IntoResponse {
    if let Err(resp) = require_business_user(&claims) {
        return resp;
    }

    match Event::delete(&state.pool, query.event_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "deleted": true })),
        ),
        Err(e) => (e.status(), error_to_api_response(e.code(), e.to_string())),
    }
}
