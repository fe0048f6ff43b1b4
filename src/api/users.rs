use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};

use horizon_core::models::User;

use super::error::ApiError;
use super::AppState;
use crate::auth::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new().route("/users/me", get(me))
}

/// The authenticated user's own record. The row is guaranteed to exist:
/// the auth middleware syncs it before any handler runs.
async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .db
        .get_user(user.id)?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user))
}
