pub mod health;
pub mod positions;
pub mod runs;

use crate::config::Config;
use crate::db::Repository;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        Self { repo, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/positions/history",
            get(positions::get_positions_history),
        )
        .route("/v1/positions/export", get(positions::export_positions))
        .route("/v1/runs", get(runs::get_runs))
        .layer(cors)
        .with_state(state)
}
