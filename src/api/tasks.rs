use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use horizon_core::models::{
    CreateTaskInput, Task, TaskListResult, TaskOrder, TaskQuery, UpdateTaskInput,
};

use super::error::ApiError;
use super::AppState;
use crate::auth::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(create_task).get(list_tasks))
        .route("/tasks/query", post(query_tasks))
        .route("/tasks/reorder", put(reorder_tasks))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/subtasks", get(list_subtasks))
        .route("/tasks/{id}/duplicate", post(duplicate_task))
        .route(
            "/tasks/{id}/goals/{goal_id}",
            post(link_goal).delete(unlink_goal),
        )
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ReorderResult {
    updated: usize,
}

async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.db.create_task(user.id, input)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Plain listing with default ordering; the full filter DSL lives on
/// `POST /tasks/query`.
async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<TaskListResult>, ApiError> {
    let query = TaskQuery {
        limit: params.limit,
        offset: params.offset,
        ..Default::default()
    };
    let result = state.db.query_tasks(user.id, &query)?;
    Ok(Json(result))
}

async fn query_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(query): Json<TaskQuery>,
) -> Result<Json<TaskListResult>, ApiError> {
    let result = state.db.query_tasks(user.id, &query)?;
    Ok(Json(result))
}

async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .db
        .get_task(user.id, id)?
        .ok_or(ApiError::NotFound("Task"))?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(updates): Json<UpdateTaskInput>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .db
        .update_task(user.id, id, updates)?
        .ok_or(ApiError::NotFound("Task"))?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_task(user.id, id)? {
        return Err(ApiError::NotFound("Task"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_subtasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let subtasks = state.db.list_subtasks(user.id, id)?;
    Ok(Json(subtasks))
}

async fn reorder_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(order): Json<Vec<TaskOrder>>,
) -> Result<Json<ReorderResult>, ApiError> {
    let updated = state.db.reorder_tasks(user.id, &order)?;
    Ok(Json(ReorderResult { updated }))
}

async fn duplicate_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let copy = state
        .db
        .duplicate_task(user.id, id)?
        .ok_or(ApiError::NotFound("Task"))?;
    Ok((StatusCode::CREATED, Json(copy)))
}

async fn link_goal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, goal_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.db.link_goal(user.id, id, goal_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unlink_goal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, goal_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    if !state.db.unlink_goal(user.id, id, goal_id)? {
        return Err(ApiError::NotFound("Goal link"));
    }
    Ok(StatusCode::NO_CONTENT)
}
