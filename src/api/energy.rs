use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use horizon_core::models::{CreateEnergyInput, EnergyReading, UpdateEnergyInput};

use super::error::ApiError;
use super::AppState;
use crate::auth::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/energy", post(create_reading).get(list_readings))
        .route("/energy/{id}", put(update_reading).delete(delete_reading))
}

#[derive(Debug, Deserialize)]
struct RangeParams {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

async fn create_reading(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateEnergyInput>,
) -> Result<(StatusCode, Json<EnergyReading>), ApiError> {
    let reading = state.db.create_reading(user.id, input)?;
    Ok((StatusCode::CREATED, Json(reading)))
}

async fn list_readings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<EnergyReading>>, ApiError> {
    let readings = state.db.list_readings(user.id, params.from, params.to)?;
    Ok(Json(readings))
}

async fn update_reading(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(updates): Json<UpdateEnergyInput>,
) -> Result<Json<EnergyReading>, ApiError> {
    let reading = state
        .db
        .update_reading(user.id, id, updates)?
        .ok_or(ApiError::NotFound("Energy reading"))?;
    Ok(Json(reading))
}

async fn delete_reading(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_reading(user.id, id)? {
        return Err(ApiError::NotFound("Energy reading"));
    }
    Ok(StatusCode::NO_CONTENT)
}
