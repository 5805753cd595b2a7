use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::rider::Rider;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/riders", post(create_rider).get(list_riders))
        .route("/riders/:id/location", patch(update_rider_location))
        .route("/riders/:id/availability", patch(update_rider_availability))
}

#[derive(Deserialize)]
pub struct CreateRiderRequest {
    pub name: String,
    pub location: Option<GeoPoint>,
    pub device_token: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub available: bool,
}

fn validate_point(point: &GeoPoint) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lng) {
        return Err(AppError::BadRequest(format!(
            "coordinates out of range: ({}, {})",
            point.lat, point.lng
        )));
    }
    Ok(())
}

async fn create_rider(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRiderRequest>,
) -> Result<Json<Rider>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if let Some(point) = &payload.location {
        validate_point(point)?;
    }

    let rider = Rider::new(payload.name, payload.location, payload.device_token);
    state.directory.insert(rider.clone());
    state
        .metrics
        .riders_available
        .set(state.directory.available_count() as i64);

    Ok(Json(rider))
}

async fn list_riders(State(state): State<Arc<AppState>>) -> Json<Vec<Rider>> {
    Json(state.directory.list())
}

async fn update_rider_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Rider>, AppError> {
    validate_point(&payload.location)?;

    let rider = state
        .directory
        .update_location(&id, payload.location)
        .ok_or_else(|| AppError::NotFound(format!("rider {} not found", id)))?;

    Ok(Json(rider))
}

async fn update_rider_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Rider>, AppError> {
    let rider = state
        .directory
        .set_availability(&id, payload.available)
        .ok_or_else(|| AppError::NotFound(format!("rider {} not found", id)))?;

    state
        .metrics
        .riders_available
        .set(state.directory.available_count() as i64);

    Ok(Json(rider))
}
