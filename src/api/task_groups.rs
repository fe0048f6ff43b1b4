use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use horizon_core::models::{CreateTaskGroupInput, TaskGroup, UpdateTaskGroupInput};

use super::error::ApiError;
use super::AppState;
use crate::auth::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/task-groups", post(create_group).get(list_groups))
        .route(
            "/task-groups/{id}",
            get(get_group).put(update_group).delete(delete_group),
        )
}

#[derive(Debug, Deserialize)]
struct ListParams {
    goal_id: Option<Uuid>,
}

async fn create_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateTaskGroupInput>,
) -> Result<(StatusCode, Json<TaskGroup>), ApiError> {
    let group = state.db.create_group(user.id, input)?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn list_groups(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TaskGroup>>, ApiError> {
    let groups = state.db.list_groups(user.id, params.goal_id)?;
    Ok(Json(groups))
}

async fn get_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskGroup>, ApiError> {
    let group = state
        .db
        .get_group(user.id, id)?
        .ok_or(ApiError::NotFound("Task group"))?;
    Ok(Json(group))
}

async fn update_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(updates): Json<UpdateTaskGroupInput>,
) -> Result<Json<TaskGroup>, ApiError> {
    let group = state
        .db
        .update_group(user.id, id, updates)?
        .ok_or(ApiError::NotFound("Task group"))?;
    Ok(Json(group))
}

async fn delete_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_group(user.id, id)? {
        return Err(ApiError::NotFound("Task group"));
    }
    Ok(StatusCode::NO_CONTENT)
}
