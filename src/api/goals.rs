use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use horizon_core::models::{
    CreateGoalInput, Goal, GoalFilter, Task, TaskGroup, UpdateGoalInput,
};

use super::error::ApiError;
use super::AppState;
use crate::auth::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/goals", post(create_goal).get(list_goals))
        .route("/goals/daily", post(daily_goal))
        .route(
            "/goals/{id}",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
        .route("/goals/{id}/tasks", get(goal_tasks))
        .route("/goals/{id}/groups", get(goal_groups))
}

#[derive(Debug, Deserialize)]
struct DailyGoalRequest {
    date: NaiveDate,
}

async fn create_goal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateGoalInput>,
) -> Result<(StatusCode, Json<Goal>), ApiError> {
    let goal = state.db.create_goal(user.id, input)?;
    Ok((StatusCode::CREATED, Json(goal)))
}

async fn list_goals(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<GoalFilter>,
) -> Result<Json<Vec<Goal>>, ApiError> {
    let goals = state.db.list_goals(user.id, &filter)?;
    Ok(Json(goals))
}

/// Get-or-create the Daily goal for one calendar date.
async fn daily_goal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<DailyGoalRequest>,
) -> Result<Json<Goal>, ApiError> {
    let goal = state.db.daily_goal(user.id, req.date)?;
    Ok(Json(goal))
}

async fn get_goal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Goal>, ApiError> {
    let goal = state
        .db
        .get_goal(user.id, id)?
        .ok_or(ApiError::NotFound("Goal"))?;
    Ok(Json(goal))
}

async fn update_goal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(updates): Json<UpdateGoalInput>,
) -> Result<Json<Goal>, ApiError> {
    let goal = state
        .db
        .update_goal(user.id, id, updates)?
        .ok_or(ApiError::NotFound("Goal"))?;
    Ok(Json(goal))
}

async fn delete_goal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_goal(user.id, id)? {
        return Err(ApiError::NotFound("Goal"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn goal_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.db.tasks_for_goal(user.id, id)?;
    Ok(Json(tasks))
}

async fn goal_groups(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TaskGroup>>, ApiError> {
    let groups = state.db.list_groups(user.id, Some(id))?;
    Ok(Json(groups))
}
