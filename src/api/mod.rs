use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use horizon_core::Database;

use crate::auth;
use crate::config::Config;

pub mod error;

mod energy;
mod goals;
mod task_groups;
mod tasks;
mod users;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

pub fn create_router(db: Database, config: Config) -> Router {
    let state = AppState {
        db,
        config: Arc::new(config),
    };

    let cors = match &state.config.frontend_url {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.clone())
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let api = Router::new()
        .merge(users::routes())
        .merge(goals::routes())
        .merge(tasks::routes())
        .merge(task_groups::routes())
        .merge(energy::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
